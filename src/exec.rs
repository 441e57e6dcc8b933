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

//! Plan executor: runs a classified [`Plan`] against a [`Registry`] and
//! collects one result per operation under a deterministic key.
//!
//! Operation-level failures (unresolvable table, malformed entry, type
//! mismatch) become `{error}` entries and never abort sibling operations.
//! Only a plan that cannot be interpreted at all makes the batch fail.

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value as Json};
use tracing::{debug, error, info, warn};

use crate::config::ExecConfig;
use crate::error::{Error, Result};
use crate::ops;
use crate::plan::{list_entries, Operation, Plan, FLEXIBLE_LABEL};
use crate::relation::{Record, Registry, Relation};

/// Keys whose presence makes a flexible plan run as an operation rather
/// than as a descriptive summary.
const FLEXIBLE_KEYS: &[&str] = &["group_by", "groupby", "aggregate", "agg_functions", "filters"];

/// Key of the single result produced by a flexible plan.
pub const MAIN_KEY: &str = "main_aggregation";

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationSummary {
    pub rows: usize,
    pub columns: Vec<String>,
    /// The operation's `type` label.
    pub operation: String,
    /// Skipped references and fallbacks; omitted when empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult {
    pub data: Vec<Record>,
    pub summary: OperationSummary,
}

impl OperationResult {
    fn new(rel: &Relation, label: &str, warnings: Vec<String>) -> Self {
        OperationResult {
            data: rel.to_records(),
            summary: OperationSummary {
                rows: rel.nrows(),
                columns: rel.column_names(),
                operation: label.to_owned(),
                warnings,
            },
        }
    }
}

/// `{data, summary}` or `{error}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OperationOutcome {
    Success(OperationResult),
    Failure { error: String },
}

impl OperationOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, OperationOutcome::Failure { .. })
    }

    pub fn result(&self) -> Option<&OperationResult> {
        match self {
            OperationOutcome::Success(r) => Some(r),
            OperationOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            OperationOutcome::Success(_) => None,
            OperationOutcome::Failure { error } => Some(error),
        }
    }
}

impl From<Result<OperationResult>> for OperationOutcome {
    fn from(r: Result<OperationResult>) -> Self {
        match r {
            Ok(res) => OperationOutcome::Success(res),
            Err(e) => OperationOutcome::Failure {
                error: e.to_string(),
            },
        }
    }
}

/// A top-level result: one operation, or the ordered steps of a
/// table-keyed plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultEntry {
    Operation(OperationOutcome),
    Steps(IndexMap<String, OperationOutcome>),
}

impl ResultEntry {
    pub fn as_operation(&self) -> Option<&OperationOutcome> {
        match self {
            ResultEntry::Operation(o) => Some(o),
            ResultEntry::Steps(_) => None,
        }
    }

    pub fn as_steps(&self) -> Option<&IndexMap<String, OperationOutcome>> {
        match self {
            ResultEntry::Operation(_) => None,
            ResultEntry::Steps(s) => Some(s),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    pub tables_processed: usize,
    pub operations_executed: usize,
    pub total_rows_processed: usize,
}

/// Batch-level outcome of [`Executor::execute`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanOutcome {
    /// False only for batch-fatal errors.
    pub success: bool,
    pub results: IndexMap<String, ResultEntry>,
    pub execution_metadata: ExecutionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlanOutcome {
    /// The single-operation result stored under `key`.
    pub fn operation(&self, key: &str) -> Option<&OperationOutcome> {
        self.results.get(key).and_then(ResultEntry::as_operation)
    }

    /// Step `step` of the table-keyed result stored under `table`.
    pub fn step(&self, table: &str, step: &str) -> Option<&OperationOutcome> {
        self.results
            .get(table)
            .and_then(ResultEntry::as_steps)
            .and_then(|s| s.get(step))
    }

    /// Number of per-operation error entries.
    pub fn error_count(&self) -> usize {
        self.results
            .values()
            .map(|e| match e {
                ResultEntry::Operation(o) => usize::from(o.is_error()),
                ResultEntry::Steps(s) => s.values().filter(|o| o.is_error()).count(),
            })
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Runs plans against a read-only table registry.
pub struct Executor<'a> {
    tables: &'a Registry,
    config: ExecConfig,
}

impl<'a> Executor<'a> {
    pub fn new(tables: &'a Registry) -> Self {
        Executor {
            tables,
            config: ExecConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecConfig) -> Self {
        self.config = config;
        self
    }

    /// Execute a JSON plan. Never panics on malformed input; see
    /// [`PlanOutcome::success`] for the batch-level status.
    pub fn execute(&self, plan: &Json) -> PlanOutcome {
        let mut summary = ExecutionSummary {
            tables_processed: self.tables.len(),
            operations_executed: 0,
            total_rows_processed: self.tables.total_rows(),
        };
        let mut results = IndexMap::new();

        info!(
            tables = ?self.tables.names(),
            total_rows = summary.total_rows_processed,
            "executing aggregation plan"
        );

        let outcome = Plan::classify(plan).and_then(|plan| {
            debug!(shape = plan.shape(), "classified plan");
            self.dispatch(&plan, &mut results, &mut summary)
        });

        match outcome {
            Ok(()) => {
                let outcome = PlanOutcome {
                    success: true,
                    results,
                    execution_metadata: summary,
                    error: None,
                };
                info!(
                    tables_processed = summary.tables_processed,
                    operations_executed = summary.operations_executed,
                    total_rows_processed = summary.total_rows_processed,
                    failed = outcome.error_count(),
                    "plan executed"
                );
                outcome
            }
            Err(e) => {
                error!(error = %e, "aggregation plan failed");
                PlanOutcome {
                    success: false,
                    results,
                    execution_metadata: summary,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn dispatch(
        &self,
        plan: &Plan,
        results: &mut IndexMap<String, ResultEntry>,
        summary: &mut ExecutionSummary,
    ) -> Result<()> {
        match plan {
            Plan::Aggregations(entries) => {
                self.run_list(entries, "aggregation", results, summary);
            }
            Plan::Operations(entries) => {
                self.run_list(entries, "operation", results, summary);
            }
            Plan::Tables(tables) => {
                for (name, steps) in tables {
                    if self.tables.get(name).is_none() {
                        debug!(table = %name, "table not in registry; skipped");
                        continue;
                    }
                    let steps = list_entries(steps, name)?;
                    let mut out = IndexMap::with_capacity(steps.len());
                    for (i, step) in steps.iter().enumerate() {
                        out.insert(format!("step_{}", i + 1), self.run_step(name, step));
                        summary.operations_executed += 1;
                    }
                    results.insert(name.clone(), ResultEntry::Steps(out));
                }
            }
            Plan::Flexible(obj) => {
                let res = self.run_flexible(obj)?;
                results.insert(
                    MAIN_KEY.to_owned(),
                    ResultEntry::Operation(OperationOutcome::Success(res)),
                );
                summary.operations_executed += 1;
            }
        }
        Ok(())
    }

    fn run_list(
        &self,
        entries: &[Json],
        prefix: &str,
        results: &mut IndexMap<String, ResultEntry>,
        summary: &mut ExecutionSummary,
    ) {
        let outcomes: Vec<OperationOutcome> = if self.config.parallel {
            entries.par_iter().map(|e| self.run_operation(e)).collect()
        } else {
            entries.iter().map(|e| self.run_operation(e)).collect()
        };
        for (i, outcome) in outcomes.into_iter().enumerate() {
            results.insert(
                format!("{prefix}_{}", i + 1),
                ResultEntry::Operation(outcome),
            );
        }
        summary.operations_executed += entries.len();
    }

    /// Parse and run a single plan entry, capturing any failure as an
    /// error outcome.
    pub fn run_operation(&self, entry: &Json) -> OperationOutcome {
        let outcome: OperationOutcome = Operation::from_json(entry)
            .and_then(|op| self.run(&op, None))
            .into();
        if let Some(e) = outcome.error() {
            error!(error = %e, entry = %entry, "operation failed");
        }
        outcome
    }

    /// Run a step of a table-keyed plan; the step is bound to `table`.
    fn run_step(&self, table: &str, entry: &Json) -> OperationOutcome {
        let outcome: OperationOutcome = Operation::from_json(entry)
            .and_then(|op| self.run(&op, Some(table)))
            .into();
        if let Some(e) = outcome.error() {
            error!(table, error = %e, "table step failed");
        }
        outcome
    }

    /// Flexible fallback: descriptive statistics of the first table unless
    /// the plan carries filters or aggregation, in which case it runs as a
    /// single operation bound to the first table.
    fn run_flexible(&self, obj: &Map<String, Json>) -> Result<OperationResult> {
        let (first, rel) = self.tables.first().ok_or_else(|| {
            Error::Plan("unrecognized plan shape and no tables to fall back on".into())
        })?;

        if !FLEXIBLE_KEYS.iter().any(|k| obj.contains_key(*k)) {
            debug!(table = first, "flexible plan: describing numeric columns");
            let described = ops::describe(rel);
            let data = described.as_ref().unwrap_or(rel);
            return Ok(OperationResult::new(data, FLEXIBLE_LABEL, Vec::new()));
        }

        let mut op = Operation::from_object(obj)?;
        if !obj.contains_key("type") {
            op.label = FLEXIBLE_LABEL.to_owned();
        }
        self.run(&op, Some(first))
    }

    /// Resolve the requested table, falling back to the first registered
    /// table. The fallback is logged and recorded as a warning.
    fn resolve(
        &self,
        requested: Option<&str>,
        warnings: &mut Vec<String>,
    ) -> Result<(&'a str, &'a Relation)> {
        let tables: &'a Registry = self.tables;
        if let Some(name) = requested {
            if let Some((key, rel)) = tables.iter().find(|(k, _)| *k == name) {
                return Ok((key, rel));
            }
        }
        let (fallback, rel) = tables.first().ok_or_else(|| Error::Resolution {
            requested: requested.unwrap_or("<none>").to_owned(),
            available: tables.names().join(", "),
        })?;
        let msg = match requested {
            Some(name) => format!("table '{name}' not found; using fallback '{fallback}'"),
            None => format!("no table specified; using first available '{fallback}'"),
        };
        warn!(requested, fallback, "table reference fell back to first table");
        warnings.push(msg);
        Ok((fallback, rel))
    }

    /// filter → group/aggregate → sort → limit over one relation.
    fn run(&self, op: &Operation, bound: Option<&str>) -> Result<OperationResult> {
        let mut warnings = Vec::new();
        let (name, rel) = match bound {
            Some(table) => {
                if let Some(other) = op.table.as_deref().filter(|t| *t != table) {
                    warn!(requested = other, table, "operation bound to another table");
                    warnings.push(format!(
                        "operation names table '{other}' but runs on '{table}'"
                    ));
                }
                let rel = self.tables.get(table).ok_or_else(|| Error::Resolution {
                    requested: table.to_owned(),
                    available: self.tables.names().join(", "),
                })?;
                (table, rel)
            }
            None => self.resolve(op.table.as_deref(), &mut warnings)?,
        };
        debug!(
            table = name,
            rows = rel.nrows(),
            filters = op.filters.len(),
            label = %op.label,
            "running operation"
        );

        let filtered = ops::filter(rel, &op.filters, &mut warnings)?;
        let mut result = match (&op.group_by, &op.aggregate) {
            (Some(keys), Some(specs)) => ops::group_aggregate(&filtered, keys, specs, &mut warnings)?,
            (None, Some(specs)) => ops::scalar_aggregate(&filtered, specs, &mut warnings)?,
            (Some(_), None) => {
                warnings.push("group_by without aggregate; rows returned ungrouped".into());
                filtered
            }
            (None, None) => filtered,
        };

        if op.invalid_sort {
            warnings.push("invalid sort config ignored".into());
        }
        if let Some(spec) = &op.sort {
            result = ops::sort(&result, spec, &mut warnings);
        }
        if let Some(n) = op.limit {
            if n < result.nrows() {
                result = result.head(n);
            }
        }

        for w in &warnings {
            debug!(table = name, warning = %w, "operation warning");
        }
        let res = OperationResult::new(&result, &op.label, warnings);
        debug!(
            rows = res.summary.rows,
            columns = res.summary.columns.len(),
            "operation completed"
        );
        Ok(res)
    }
}

/// Execute `plan` against `tables` with default settings.
pub fn execute(plan: &Json, tables: &Registry) -> PlanOutcome {
    Executor::new(tables).execute(plan)
}
