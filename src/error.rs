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

//! Error type shared by the profiler, the plan executor and the CSV loader.

use thiserror::Error;

/// Errors produced while loading relations or running a plan.
///
/// `Resolution`, `Shape`, `Type` and `UnknownFunction` are scoped to a
/// single operation: the executor turns them into that operation's
/// `{error}` entry. `Plan` is batch-fatal.
#[derive(Debug, Error)]
pub enum Error {
    /// No table could be resolved for an operation.
    #[error("no valid table found (requested: {requested}, available: [{available}])")]
    Resolution { requested: String, available: String },
    /// An operation (or part of one) is not a well-formed mapping.
    #[error("malformed operation: {0}")]
    Shape(String),
    /// A predicate or aggregate was applied to an incompatible column.
    #[error("type error: {0}")]
    Type(String),
    /// Aggregate function name not recognized.
    #[error("unsupported aggregate function '{0}'")]
    UnknownFunction(String),
    /// The plan as a whole cannot be interpreted.
    #[error("malformed plan: {0}")]
    Plan(String),
    /// Relation construction failed (ragged columns, duplicate names).
    #[error("schema error: {0}")]
    Schema(String),
    /// The external plan generator failed.
    #[error("plan generation failed: {0}")]
    Generator(String),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
