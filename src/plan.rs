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

//! Aggregation plans: the closed set of accepted plan shapes and the typed
//! operation each plan entry is parsed into.
//!
//! Plans arrive as schema-less JSON from an external author. Shape
//! classification ([`Plan::classify`]) only looks at the top-level keys;
//! individual entries stay raw until execution so that a malformed entry
//! fails alone ([`Operation::from_json`]).

use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Value as Json};

use crate::error::{Error, Result};

/// Default `type` label of an operation.
pub const DEFAULT_LABEL: &str = "aggregation";
/// Label of the flexible fallback operation.
pub const FLEXIBLE_LABEL: &str = "flexible_execution";

// ---------------------------------------------------------------------------
// Plan shapes
// ---------------------------------------------------------------------------

/// A classified plan. Variants are listed in dispatch precedence order.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// `{"aggregations": [...]}` → keys `aggregation_{i}`.
    Aggregations(Vec<Json>),
    /// `{"operations": [...]}` → keys `operation_{i}`.
    Operations(Vec<Json>),
    /// `{"tables": {name: [...]}}` → `name` → `step_{i}`. Step lists stay
    /// raw so that entries for unregistered tables are never inspected.
    Tables(IndexMap<String, Json>),
    /// Anything else: the whole plan is one operation.
    Flexible(Map<String, Json>),
}

impl Plan {
    /// Classify a plan by its top-level keys; first match wins.
    ///
    /// Fails when the plan is not an object or when a dispatch key holds
    /// the wrong kind of JSON value. Per-table step lists are checked by
    /// the executor once the table is known to exist.
    pub fn classify(plan: &Json) -> Result<Plan> {
        let obj = plan
            .as_object()
            .ok_or_else(|| Error::Plan(format!("expected a JSON object, got {}", kind(plan))))?;

        if let Some(list) = obj.get("aggregations") {
            return list_entries(list, "aggregations").map(Plan::Aggregations);
        }
        if let Some(list) = obj.get("operations") {
            return list_entries(list, "operations").map(Plan::Operations);
        }
        if let Some(tables) = obj.get("tables") {
            let tables = tables.as_object().ok_or_else(|| {
                Error::Plan(format!("'tables' must be an object, got {}", kind(tables)))
            })?;
            let out = tables
                .iter()
                .map(|(name, steps)| (name.clone(), steps.clone()))
                .collect();
            return Ok(Plan::Tables(out));
        }
        Ok(Plan::Flexible(obj.clone()))
    }

    /// Short name of the shape, for logging.
    pub fn shape(&self) -> &'static str {
        match self {
            Plan::Aggregations(_) => "aggregations",
            Plan::Operations(_) => "operations",
            Plan::Tables(_) => "tables",
            Plan::Flexible(_) => "flexible",
        }
    }
}

pub(crate) fn list_entries(v: &Json, what: &str) -> Result<Vec<Json>> {
    v.as_array()
        .cloned()
        .ok_or_else(|| Error::Plan(format!("'{what}' must be a list, got {}", kind(v))))
}

/// JSON kind name used in error messages.
pub(crate) fn kind(v: &Json) -> &'static str {
    match v {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "list",
        Json::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Comparison operator of a filter predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    In,
    /// Not recognized; the predicate is skipped at execution time.
    Unknown(String),
}

impl FilterOp {
    pub fn parse(s: &str) -> FilterOp {
        match s.trim() {
            "==" | "=" => FilterOp::Eq,
            "!=" | "<>" => FilterOp::Ne,
            ">" => FilterOp::Gt,
            "<" => FilterOp::Lt,
            ">=" => FilterOp::Ge,
            "<=" => FilterOp::Le,
            "in" | "IN" => FilterOp::In,
            other => FilterOp::Unknown(other.to_owned()),
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FilterOp::Eq => "==",
            FilterOp::Ne => "!=",
            FilterOp::Gt => ">",
            FilterOp::Lt => "<",
            FilterOp::Ge => ">=",
            FilterOp::Le => "<=",
            FilterOp::In => "in",
            FilterOp::Unknown(s) => s,
        };
        f.write_str(s)
    }
}

/// `{column, operator, value}`; operator defaults to `==`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Json,
}

impl Filter {
    fn from_json(v: &Json) -> Result<Filter> {
        let obj = v
            .as_object()
            .ok_or_else(|| Error::Shape(format!("filter must be an object, got {}", kind(v))))?;
        let column = obj
            .get("column")
            .and_then(Json::as_str)
            .ok_or_else(|| Error::Shape("filter is missing 'column'".into()))?
            .to_owned();
        let op = match obj.get("operator") {
            None | Some(Json::Null) => FilterOp::Eq,
            Some(Json::String(s)) => FilterOp::parse(s),
            Some(other) => {
                return Err(Error::Shape(format!(
                    "filter operator must be a string, got {}",
                    kind(other)
                )))
            }
        };
        Ok(Filter {
            column,
            op,
            value: obj.get("value").cloned().unwrap_or(Json::Null),
        })
    }
}

// ---------------------------------------------------------------------------
// Aggregate functions
// ---------------------------------------------------------------------------

/// Statistical function applied per aggregate column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggFunc {
    Sum,
    Mean,
    Count,
    Min,
    Max,
    Std,
    Var,
    Median,
    First,
    Last,
    Nunique,
}

impl AggFunc {
    pub fn parse(name: &str) -> Result<AggFunc> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(AggFunc::Sum),
            "mean" | "avg" | "average" => Ok(AggFunc::Mean),
            "count" | "size" => Ok(AggFunc::Count),
            "min" => Ok(AggFunc::Min),
            "max" => Ok(AggFunc::Max),
            "std" | "stddev" => Ok(AggFunc::Std),
            "var" | "variance" => Ok(AggFunc::Var),
            "median" => Ok(AggFunc::Median),
            "first" => Ok(AggFunc::First),
            "last" => Ok(AggFunc::Last),
            "nunique" | "count_distinct" => Ok(AggFunc::Nunique),
            _ => Err(Error::UnknownFunction(name.to_owned())),
        }
    }

    /// Suffix used in `{column}_{function}` result names.
    pub fn name(self) -> &'static str {
        match self {
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
            AggFunc::Count => "count",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::Std => "std",
            AggFunc::Var => "var",
            AggFunc::Median => "median",
            AggFunc::First => "first",
            AggFunc::Last => "last",
            AggFunc::Nunique => "nunique",
        }
    }

    /// Functions that only make sense over numbers.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            AggFunc::Sum | AggFunc::Mean | AggFunc::Std | AggFunc::Var | AggFunc::Median
        )
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One aggregate column with its requested functions, in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct AggSpec {
    pub column: String,
    pub funcs: Vec<AggFunc>,
}

fn parse_aggregate(v: &Json) -> Result<Vec<AggSpec>> {
    let obj = v
        .as_object()
        .ok_or_else(|| Error::Shape(format!("aggregate must be an object, got {}", kind(v))))?;
    let mut specs = Vec::with_capacity(obj.len());
    for (column, funcs) in obj {
        let funcs = match funcs {
            Json::String(s) => vec![AggFunc::parse(s)?],
            Json::Array(items) => items
                .iter()
                .map(|f| {
                    f.as_str().ok_or_else(|| {
                        Error::Shape(format!(
                            "aggregate function for '{column}' must be a string, got {}",
                            kind(f)
                        ))
                    })
                    .and_then(AggFunc::parse)
                })
                .collect::<Result<Vec<_>>>()?,
            other => {
                return Err(Error::Shape(format!(
                    "aggregate for '{column}' must be a string or list, got {}",
                    kind(other)
                )))
            }
        };
        specs.push(AggSpec {
            column: column.clone(),
            funcs,
        });
    }
    Ok(specs)
}

// ---------------------------------------------------------------------------
// Sort
// ---------------------------------------------------------------------------

/// Single-key sort. Only the first entry of a sort list is honoured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub ascending: bool,
}

impl SortSpec {
    fn from_object(obj: &Map<String, Json>) -> Option<SortSpec> {
        let column = obj.get("column")?.as_str()?.to_owned();
        let ascending = obj.get("ascending").and_then(Json::as_bool).unwrap_or(true);
        Some(SortSpec { column, ascending })
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A parsed plan entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Operation {
    /// Requested table; may not exist in the registry.
    pub table: Option<String>,
    pub filters: Vec<Filter>,
    /// `None` when absent or empty.
    pub group_by: Option<Vec<String>>,
    /// `None` when absent or empty.
    pub aggregate: Option<Vec<AggSpec>>,
    pub sort: Option<SortSpec>,
    /// Set when a `sort` value was present but unusable.
    pub invalid_sort: bool,
    pub limit: Option<usize>,
    pub label: String,
}

impl Operation {
    /// Parse one plan entry. Accepts `group_by`/`groupby` and
    /// `aggregate`/`agg_functions`; empty lists and maps count as absent.
    pub fn from_json(v: &Json) -> Result<Operation> {
        let obj = v.as_object().ok_or_else(|| {
            Error::Shape(format!(
                "expected operation to be an object, got {}: {v}",
                kind(v)
            ))
        })?;
        Operation::from_object(obj)
    }

    pub fn from_object(obj: &Map<String, Json>) -> Result<Operation> {
        let table = match obj.get("table") {
            Some(Json::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        };

        let filters = match obj.get("filters") {
            None | Some(Json::Null) => Vec::new(),
            Some(Json::Array(items)) => items
                .iter()
                .map(Filter::from_json)
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(Error::Shape(format!(
                    "filters must be a list, got {}",
                    kind(other)
                )))
            }
        };

        let group_by = first_present(obj, &["group_by", "groupby"])
            .map(parse_group_by)
            .transpose()?
            .filter(|cols| !cols.is_empty());

        let aggregate = first_present(obj, &["aggregate", "agg_functions"])
            .map(parse_aggregate)
            .transpose()?
            .filter(|specs| !specs.is_empty());

        let (sort, invalid_sort) = match obj.get("sort") {
            None | Some(Json::Null) => (None, false),
            Some(Json::Object(o)) => {
                let spec = SortSpec::from_object(o);
                let invalid = spec.is_none();
                (spec, invalid)
            }
            Some(Json::Array(items)) => {
                let spec = items
                    .first()
                    .and_then(Json::as_object)
                    .and_then(SortSpec::from_object);
                let invalid = spec.is_none();
                (spec, invalid)
            }
            Some(_) => (None, true),
        };

        let limit = match obj.get("limit") {
            None | Some(Json::Null) => None,
            Some(v) => Some(
                v.as_u64()
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| {
                        Error::Shape(format!("limit must be a non-negative integer, got {v}"))
                    })?,
            ),
        };

        let label = obj
            .get("type")
            .and_then(Json::as_str)
            .unwrap_or(DEFAULT_LABEL)
            .to_owned();

        Ok(Operation {
            table,
            filters,
            group_by,
            aggregate,
            sort,
            invalid_sort,
            limit,
            label,
        })
    }
}

/// First of `keys` holding a non-empty value (empty string/list/map and
/// null count as absent).
fn first_present<'a>(obj: &'a Map<String, Json>, keys: &[&str]) -> Option<&'a Json> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| match v {
        Json::Null => false,
        Json::String(s) => !s.is_empty(),
        Json::Array(a) => !a.is_empty(),
        Json::Object(o) => !o.is_empty(),
        _ => true,
    })
}

fn parse_group_by(v: &Json) -> Result<Vec<String>> {
    match v {
        Json::String(s) => Ok(vec![s.clone()]),
        Json::Array(items) => items
            .iter()
            .map(|c| {
                c.as_str().map(str::to_owned).ok_or_else(|| {
                    Error::Shape(format!("group_by entries must be strings, got {}", kind(c)))
                })
            })
            .collect(),
        other => Err(Error::Shape(format!(
            "group_by must be a string or list, got {}",
            kind(other)
        ))),
    }
}
