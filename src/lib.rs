//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

//! tabplan: schema profiling and declarative aggregation plans over
//! in-memory tables.
//!
//! A caller registers named [`Relation`]s in a [`Registry`], profiles them
//! with [`profile()`] to obtain the [`Metadata`] an external plan author
//! needs, and runs the returned JSON plan with [`Executor`]. Plans may come
//! in several shapes (a list of aggregations, a list of operations, a
//! table-keyed map, or a free-form single operation); each operation
//! filters, groups and aggregates, sorts and limits one table and fails on
//! its own without aborting the batch.
//!
//! ```no_run
//! use tabplan::{Executor, ProfileConfig, Registry, Relation};
//!
//! let mut tables = Registry::new();
//! tables.register("sales", Relation::read_csv("sales.csv")?);
//! let metadata = tabplan::profile(&tables, &ProfileConfig::default());
//! println!("{}", metadata.to_json_pretty()?);
//!
//! let plan = serde_json::json!({
//!     "aggregations": [{
//!         "table": "sales",
//!         "group_by": ["loc"],
//!         "aggregate": {"amt": ["sum"]},
//!         "sort": {"column": "amt_sum", "ascending": false},
//!         "limit": 1
//!     }]
//! });
//! let outcome = Executor::new(&tables).execute(&plan);
//! assert!(outcome.success);
//! # Ok::<(), tabplan::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod exec;
pub mod ops;
pub mod pipeline;
pub mod plan;
pub mod profile;
pub mod relation;

pub use config::{Config, ExecConfig, ProfileConfig};
pub use error::{Error, Result};
pub use exec::{
    execute, ExecutionSummary, Executor, OperationOutcome, OperationResult, OperationSummary,
    PlanOutcome, ResultEntry,
};
pub use pipeline::{analyze, Analysis, PlanGenerator};
pub use plan::{AggFunc, AggSpec, Filter, FilterOp, Operation, Plan, SortSpec};
pub use profile::{normalize_table_name, profile, ColumnMetadata, Metadata, TableMetadata};
pub use relation::{Column, DataType, Record, Registry, Relation, Value};
