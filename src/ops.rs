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

//! Relational kernels used by the plan executor: filter, grouped and scalar
//! aggregation, sort, and descriptive statistics.
//!
//! Every kernel reads its input relation and returns a new one. References
//! to unknown columns are skipped and reported through the `warnings`
//! vector instead of failing the operation.

use std::cmp::Ordering;
use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value as Json;

use crate::error::{Error, Result};
use crate::plan::{kind, AggFunc, AggSpec, Filter, FilterOp, SortSpec};
use crate::relation::{parse_datetime, Column, DataType, Relation, Value, ValueKey};

/// Row labels of [`describe`], in output order.
pub const DESCRIBE_STATS: &[&str] = &["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Apply `filters` in order as a logical AND.
pub fn filter(rel: &Relation, filters: &[Filter], warnings: &mut Vec<String>) -> Result<Relation> {
    let mut rows: Vec<usize> = (0..rel.nrows()).collect();
    for f in filters {
        let Some(col) = rel.column(&f.column) else {
            warnings.push(format!(
                "filter column '{}' not found; predicate skipped",
                f.column
            ));
            continue;
        };
        if let FilterOp::Unknown(op) = &f.op {
            warnings.push(format!(
                "unsupported filter operator '{op}' on '{}'; predicate skipped",
                f.column
            ));
            continue;
        }
        let pred = Predicate::new(col, f)?;
        let mut kept = Vec::with_capacity(rows.len());
        for r in rows {
            if pred.matches(col.get(r))? {
                kept.push(r);
            }
        }
        rows = kept;
    }
    if rows.len() == rel.nrows() {
        return Ok(rel.clone());
    }
    Ok(rel.take(&rows))
}

/// A filter with its literal converted to the column's domain.
struct Predicate<'a> {
    column: &'a str,
    dtype: DataType,
    op: &'a FilterOp,
    literal: Value,
    set: Vec<Value>,
}

impl<'a> Predicate<'a> {
    fn new(col: &'a Column, f: &'a Filter) -> Result<Predicate<'a>> {
        let dtype = col.dtype();
        let set = if f.op == FilterOp::In {
            let items = f.value.as_array().ok_or_else(|| {
                Error::Shape(format!(
                    "'in' filter on '{}' needs a list value, got {}",
                    f.column,
                    kind(&f.value)
                ))
            })?;
            items.iter().map(|v| literal_for(dtype, v)).collect()
        } else {
            Vec::new()
        };
        Ok(Predicate {
            column: &f.column,
            dtype,
            op: &f.op,
            literal: literal_for(dtype, &f.value),
            set,
        })
    }

    fn matches(&self, cell: &Value) -> Result<bool> {
        let equal = |lit: &Value| cell.partial_compare(lit) == Some(Ordering::Equal);
        let ord = match self.op {
            FilterOp::Eq => return Ok(equal(&self.literal)),
            FilterOp::Ne => return Ok(!equal(&self.literal)),
            FilterOp::In => return Ok(self.set.iter().any(equal)),
            FilterOp::Unknown(_) => return Ok(true),
            FilterOp::Gt | FilterOp::Lt | FilterOp::Ge | FilterOp::Le => {
                if cell.is_null() {
                    return Ok(false);
                }
                cell.partial_compare(&self.literal).ok_or_else(|| {
                    Error::Type(format!(
                        "'{}' not supported between {} column '{}' and {}",
                        self.op,
                        self.dtype,
                        self.column,
                        describe_literal(&self.literal)
                    ))
                })?
            }
        };
        Ok(match self.op {
            FilterOp::Gt => ord == Ordering::Greater,
            FilterOp::Lt => ord == Ordering::Less,
            FilterOp::Ge => ord != Ordering::Less,
            _ => ord != Ordering::Greater,
        })
    }
}

/// Convert a JSON literal for comparison against a column of `dtype`.
/// Text literals against timestamp columns are parsed as timestamps.
fn literal_for(dtype: DataType, v: &Json) -> Value {
    match (dtype, v) {
        (DataType::Datetime, Json::String(s)) => {
            parse_datetime(s).map_or_else(|| Value::Str(s.clone()), Value::DateTime)
        }
        _ => Value::from_json(v),
    }
}

fn describe_literal(v: &Value) -> String {
    match v {
        Value::Null => "null".into(),
        Value::Int(_) | Value::Float(_) => format!("number {v}"),
        Value::DateTime(_) => format!("timestamp {v}"),
        Value::Str(s) => format!("text '{s}'"),
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Result column name for `func` over `column`.
pub fn agg_column_name(column: &str, func: AggFunc) -> String {
    format!("{column}_{}", func.name())
}

/// Keep the aggregate specs whose column exists, checking that numeric
/// functions only target numeric columns.
fn resolve_specs<'a>(
    rel: &'a Relation,
    specs: &'a [AggSpec],
    warnings: &mut Vec<String>,
) -> Result<Vec<(&'a Column, &'a [AggFunc])>> {
    let mut out = Vec::with_capacity(specs.len());
    for spec in specs {
        let Some(col) = rel.column(&spec.column) else {
            warnings.push(format!(
                "aggregate column '{}' not found; skipped",
                spec.column
            ));
            continue;
        };
        if let Some(f) = spec.funcs.iter().find(|f| f.is_numeric()) {
            if !col.dtype().is_numeric() {
                return Err(Error::Type(format!(
                    "cannot apply '{f}' to {} column '{}'",
                    col.dtype(),
                    col.name()
                )));
            }
        }
        out.push((col, spec.funcs.as_slice()));
    }
    Ok(out)
}

/// Group by the surviving `group_by` columns and aggregate each spec.
///
/// Rows with a null in any key column are dropped; groups are emitted in
/// ascending key order. When no key column survives the input passes
/// through; when no aggregate column survives the result carries the group
/// size as `count`.
pub fn group_aggregate(
    rel: &Relation,
    group_by: &[String],
    specs: &[AggSpec],
    warnings: &mut Vec<String>,
) -> Result<Relation> {
    let mut keys: Vec<&Column> = Vec::with_capacity(group_by.len());
    for name in group_by {
        match rel.column(name) {
            Some(col) => keys.push(col),
            None => warnings.push(format!("group_by column '{name}' not found; skipped")),
        }
    }
    if keys.is_empty() {
        warnings.push("no usable group_by columns; returning rows ungrouped".into());
        return Ok(rel.clone());
    }
    let aggs = resolve_specs(rel, specs, warnings)?;

    let mut groups: IndexMap<Vec<ValueKey>, Vec<usize>> = IndexMap::new();
    for r in 0..rel.nrows() {
        if keys.iter().any(|k| k.get(r).is_null()) {
            continue;
        }
        let key: Vec<ValueKey> = keys.iter().map(|k| k.get(r).key()).collect();
        groups.entry(key).or_default().push(r);
    }
    groups.sort_keys();
    let groups: Vec<Vec<usize>> = groups.into_values().collect();

    let firsts: Vec<usize> = groups.iter().map(|g| g[0]).collect();
    let mut columns: Vec<Column> = keys.iter().map(|k| k.take(&firsts)).collect();

    if aggs.is_empty() {
        let sizes = groups.iter().map(|g| Value::Int(g.len() as i64)).collect();
        columns.push(Column::with_type("count", DataType::Int, sizes));
    } else {
        for (col, funcs) in aggs {
            for &func in funcs {
                let values = groups
                    .iter()
                    .map(|rows| aggregate(func, col, rows))
                    .collect::<Result<Vec<_>>>()?;
                columns.push(Column::with_type(
                    agg_column_name(col.name(), func),
                    output_type(func, col.dtype()),
                    values,
                ));
            }
        }
    }
    Relation::new(columns)
}

/// Ungrouped aggregation: a single row with one `{column}_{function}` cell
/// per requested function. No surviving column yields an empty relation.
pub fn scalar_aggregate(
    rel: &Relation,
    specs: &[AggSpec],
    warnings: &mut Vec<String>,
) -> Result<Relation> {
    let aggs = resolve_specs(rel, specs, warnings)?;
    if aggs.is_empty() {
        return Ok(Relation::default());
    }
    let rows: Vec<usize> = (0..rel.nrows()).collect();
    let mut columns = Vec::new();
    for (col, funcs) in aggs {
        for &func in funcs {
            columns.push(Column::with_type(
                agg_column_name(col.name(), func),
                output_type(func, col.dtype()),
                vec![aggregate(func, col, &rows)?],
            ));
        }
    }
    Relation::new(columns)
}

fn output_type(func: AggFunc, input: DataType) -> DataType {
    match func {
        AggFunc::Sum if input == DataType::Int => DataType::Int,
        AggFunc::Sum | AggFunc::Mean | AggFunc::Std | AggFunc::Var | AggFunc::Median => {
            DataType::Float
        }
        AggFunc::Count | AggFunc::Nunique => DataType::Int,
        AggFunc::Min | AggFunc::Max | AggFunc::First | AggFunc::Last => input,
    }
}

/// Evaluate `func` over the non-null cells of `col` at `rows`.
pub fn aggregate(func: AggFunc, col: &Column, rows: &[usize]) -> Result<Value> {
    let cells = rows.iter().map(|&r| col.get(r)).filter(|v| !v.is_null());
    Ok(match func {
        AggFunc::Count => Value::Int(cells.count() as i64),
        AggFunc::Nunique => {
            let distinct: HashSet<ValueKey> = cells.map(Value::key).collect();
            Value::Int(distinct.len() as i64)
        }
        AggFunc::First => cells.cloned().next().unwrap_or(Value::Null),
        AggFunc::Last => cells.cloned().last().unwrap_or(Value::Null),
        AggFunc::Min => cells
            .min_by(|a, b| a.total_cmp(b))
            .cloned()
            .unwrap_or(Value::Null),
        AggFunc::Max => cells
            .max_by(|a, b| a.total_cmp(b))
            .cloned()
            .unwrap_or(Value::Null),
        AggFunc::Sum if col.dtype() == DataType::Int => {
            let mut acc: i64 = 0;
            for v in cells {
                if let Value::Int(i) = v {
                    acc = acc.checked_add(*i).ok_or_else(|| {
                        Error::Type(format!("integer overflow summing '{}'", col.name()))
                    })?;
                }
            }
            Value::Int(acc)
        }
        AggFunc::Sum => Value::Float(cells.filter_map(Value::as_f64).sum()),
        AggFunc::Mean => {
            let xs: Vec<f64> = cells.filter_map(Value::as_f64).collect();
            mean(&xs).map_or(Value::Null, Value::Float)
        }
        AggFunc::Var => {
            let xs: Vec<f64> = cells.filter_map(Value::as_f64).collect();
            variance(&xs).map_or(Value::Null, Value::Float)
        }
        AggFunc::Std => {
            let xs: Vec<f64> = cells.filter_map(Value::as_f64).collect();
            variance(&xs).map_or(Value::Null, |v| Value::Float(v.sqrt()))
        }
        AggFunc::Median => {
            let mut xs: Vec<f64> = cells.filter_map(Value::as_f64).collect();
            xs.sort_by(f64::total_cmp);
            quantile(&xs, 0.5).map_or(Value::Null, Value::Float)
        }
    })
}

fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Sample variance (n − 1); undefined below two observations.
fn variance(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let m = mean(xs)?;
    let ss: f64 = xs.iter().map(|x| (x - m) * (x - m)).sum();
    Some(ss / (xs.len() - 1) as f64)
}

/// Linear-interpolated quantile of an ascending slice.
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

// ---------------------------------------------------------------------------
// Sort
// ---------------------------------------------------------------------------

/// Stable single-key sort; nulls go last in either direction.
pub fn sort(rel: &Relation, spec: &SortSpec, warnings: &mut Vec<String>) -> Relation {
    let Some(col) = rel.column(&spec.column) else {
        warnings.push(format!("sort column '{}' not found; order unchanged", spec.column));
        return rel.clone();
    };
    let mut rows: Vec<usize> = (0..rel.nrows()).collect();
    rows.sort_by(|&a, &b| {
        let (x, y) = (col.get(a), col.get(b));
        match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) if spec.ascending => x.total_cmp(y),
            (false, false) => y.total_cmp(x),
        }
    });
    rel.take(&rows)
}

// ---------------------------------------------------------------------------
// Describe
// ---------------------------------------------------------------------------

/// Descriptive statistics over the numeric columns of `rel`: a leading
/// `statistic` column followed by one float column per numeric column.
/// Returns `None` when there are no numeric columns.
pub fn describe(rel: &Relation) -> Option<Relation> {
    let numeric: Vec<&Column> = rel
        .columns()
        .iter()
        .filter(|c| c.dtype().is_numeric())
        .collect();
    if numeric.is_empty() {
        return None;
    }
    let labels = DESCRIBE_STATS
        .iter()
        .map(|s| Value::Str((*s).to_owned()))
        .collect();
    let mut columns = vec![Column::with_type("statistic", DataType::String, labels)];
    for col in numeric {
        let mut xs: Vec<f64> = col.non_null().filter_map(Value::as_f64).collect();
        xs.sort_by(f64::total_cmp);
        let stats = [
            Some(xs.len() as f64),
            mean(&xs),
            variance(&xs).map(f64::sqrt),
            xs.first().copied(),
            quantile(&xs, 0.25),
            quantile(&xs, 0.5),
            quantile(&xs, 0.75),
            xs.last().copied(),
        ];
        let values = stats
            .into_iter()
            .map(|s| s.map_or(Value::Null, Value::Float))
            .collect();
        columns.push(Column::with_type(col.name(), DataType::Float, values));
    }
    Relation::new(columns).ok()
}
