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

//! In-memory relations: typed cells, columns, tables and the named registry
//! the executor resolves table references against.

use std::cmp::Ordering;
use std::fmt;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One output row: column name → JSON value, in column order.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// CSV tokens read as null in addition to the empty field.
const NULL_TOKENS: &[&str] = &["NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

// ---------------------------------------------------------------------------
// DataType
// ---------------------------------------------------------------------------

/// Inferred column type. Text is the fallback for anything not
/// unambiguously numeric or temporal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int,
    Float,
    Datetime,
    String,
}

impl DataType {
    /// Classify a column from its non-null text cells.
    ///
    /// Priority is int, then float, then datetime; a column with no cells
    /// or with any cell that fits none of those is text.
    pub fn infer<'a, I>(cells: I) -> DataType
    where
        I: IntoIterator<Item = &'a str>,
        I::IntoIter: Clone,
    {
        let cells = cells.into_iter();
        if cells.clone().next().is_none() {
            return DataType::String;
        }
        if cells.clone().all(|c| parse_int(c).is_some()) {
            DataType::Int
        } else if cells.clone().all(|c| parse_float(c).is_some()) {
            DataType::Float
        } else if cells.clone().all(|c| parse_datetime(c).is_some()) {
            DataType::Datetime
        } else {
            DataType::String
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Int | DataType::Float)
    }

    /// Whether min/max are reported for columns of this type.
    pub fn has_range(self) -> bool {
        !matches!(self, DataType::String)
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Datetime => "datetime",
            DataType::String => "string",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn parse_int(s: &str) -> Option<i64> {
    s.trim().parse::<i64>().ok()
}

fn parse_float(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

/// Parse a timestamp or a bare date (midnight). RFC 3339 offsets are
/// normalized to UTC.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    DateTime(NaiveDateTime),
    Str(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert a JSON scalar. Booleans become text; arrays and objects are
    /// kept as their JSON text.
    pub fn from_json(v: &serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Str(b.to_string()),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            other => Value::Str(other.to_string()),
        }
    }

    /// JSON form used in row-records. Non-finite floats become null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::DateTime(dt) => {
                serde_json::Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
            Value::Str(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Comparison between two non-null cells of compatible kinds. Returns
    /// `None` when either side is null or the kinds are not comparable.
    pub fn partial_compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    /// Total order used for sorting and group ordering: numbers, then
    /// timestamps, then text, then null.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Int(_) | Value::Float(_) => 0,
                Value::DateTime(_) => 1,
                Value::Str(_) => 2,
                Value::Null => 3,
            }
        }
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => rank(a).cmp(&rank(b)),
            },
        }
    }

    /// Hashable identity of the cell. Integral floats share the key of the
    /// equal integer, so `1` and `1.0` are the same set member.
    pub fn key(&self) -> ValueKey {
        match self {
            Value::Null => ValueKey::Null,
            Value::Int(v) => ValueKey::Int(*v),
            Value::Float(v) => {
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 {
                    ValueKey::Int(*v as i64)
                } else {
                    ValueKey::Float(v.to_bits())
                }
            }
            Value::DateTime(dt) => ValueKey::DateTime(*dt),
            Value::Str(s) => ValueKey::Str(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::Str(s) => f.write_str(s),
        }
    }
}

/// Hash/equality key for a cell; see [`Value::key`].
///
/// Ordered like [`Value::total_cmp`]: numbers, then timestamps, then text,
/// then null.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Null,
    Int(i64),
    Float(u64),
    DateTime(NaiveDateTime),
    Str(String),
}

impl ValueKey {
    fn rank(&self) -> u8 {
        match self {
            ValueKey::Int(_) | ValueKey::Float(_) => 0,
            ValueKey::DateTime(_) => 1,
            ValueKey::Str(_) => 2,
            ValueKey::Null => 3,
        }
    }
}

impl Ord for ValueKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ValueKey::Int(a), ValueKey::Int(b)) => a.cmp(b),
            (ValueKey::Float(a), ValueKey::Float(b)) => {
                f64::from_bits(*a).total_cmp(&f64::from_bits(*b))
            }
            // Ties between an int and a float outside the exact i64 range
            // put the int first so the order stays consistent with `Eq`.
            (ValueKey::Int(a), ValueKey::Float(b)) => (*a as f64)
                .total_cmp(&f64::from_bits(*b))
                .then(Ordering::Less),
            (ValueKey::Float(a), ValueKey::Int(b)) => f64::from_bits(*a)
                .total_cmp(&(*b as f64))
                .then(Ordering::Greater),
            (ValueKey::DateTime(a), ValueKey::DateTime(b)) => a.cmp(b),
            (ValueKey::Str(a), ValueKey::Str(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for ValueKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

/// A named, homogeneously typed column. Every non-null cell holds a value
/// of the column's [`DataType`].
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    dtype: DataType,
    values: Vec<Value>,
}

impl Column {
    /// Build a column from already-typed cells, inferring the column type.
    /// Integers widen to floats when mixed with floats; any other mix is
    /// rendered as text.
    pub fn from_values(name: impl Into<String>, values: Vec<Value>) -> Column {
        let mut has_int = false;
        let mut has_float = false;
        let mut has_dt = false;
        let mut has_str = false;
        for v in &values {
            match v {
                Value::Null => {}
                Value::Int(_) => has_int = true,
                Value::Float(_) => has_float = true,
                Value::DateTime(_) => has_dt = true,
                Value::Str(_) => has_str = true,
            }
        }
        let dtype = match (has_int, has_float, has_dt, has_str) {
            (true, false, false, false) => DataType::Int,
            (_, true, false, false) => DataType::Float,
            (false, false, true, false) => DataType::Datetime,
            _ => DataType::String,
        };
        let values = match dtype {
            DataType::Float => values
                .into_iter()
                .map(|v| match v {
                    Value::Int(i) => Value::Float(i as f64),
                    other => other,
                })
                .collect(),
            DataType::String => values
                .into_iter()
                .map(|v| match v {
                    Value::Null | Value::Str(_) => v,
                    other => Value::Str(other.to_string()),
                })
                .collect(),
            _ => values,
        };
        Column {
            name: name.into(),
            dtype,
            values,
        }
    }

    /// Build a column from raw text cells (`None` = null), classifying it
    /// with [`DataType::infer`].
    pub fn from_text(name: impl Into<String>, cells: Vec<Option<String>>) -> Column {
        let dtype = DataType::infer(cells.iter().flatten().map(|s| s.as_str()));
        let values = cells
            .into_iter()
            .map(|cell| match cell {
                None => Value::Null,
                Some(s) => match dtype {
                    DataType::Int => parse_int(&s).map_or(Value::Null, Value::Int),
                    DataType::Float => parse_float(&s).map_or(Value::Null, Value::Float),
                    DataType::Datetime => parse_datetime(&s).map_or(Value::Null, Value::DateTime),
                    DataType::String => Value::Str(s),
                },
            })
            .collect();
        Column {
            name: name.into(),
            dtype,
            values,
        }
    }

    /// Build a column whose type is known by construction.
    pub(crate) fn with_type(name: impl Into<String>, dtype: DataType, values: Vec<Value>) -> Column {
        Column {
            name: name.into(),
            dtype,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, row: usize) -> &Value {
        self.values.get(row).unwrap_or(&Value::Null)
    }

    /// Non-null cells in row order.
    pub fn non_null(&self) -> impl Iterator<Item = &Value> + Clone {
        self.values.iter().filter(|v| !v.is_null())
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// New column holding the cells at `rows`, in that order.
    pub fn take(&self, rows: &[usize]) -> Column {
        Column {
            name: self.name.clone(),
            dtype: self.dtype,
            values: rows.iter().map(|&r| self.get(r).clone()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Relation
// ---------------------------------------------------------------------------

/// An immutable in-memory table: ordered, uniquely named columns of equal
/// length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relation {
    columns: Vec<Column>,
    nrows: usize,
}

impl Relation {
    /// Assemble a relation, checking column lengths and name uniqueness.
    pub fn new(columns: Vec<Column>) -> Result<Relation> {
        let nrows = columns.first().map_or(0, Column::len);
        for (i, col) in columns.iter().enumerate() {
            if col.len() != nrows {
                return Err(Error::Schema(format!(
                    "column '{}' has {} rows, expected {nrows}",
                    col.name,
                    col.len()
                )));
            }
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(Error::Schema(format!("duplicate column '{}'", col.name)));
            }
        }
        Ok(Relation { columns, nrows })
    }

    /// Build from JSON row-records. Column order is first appearance;
    /// keys missing from a row are null.
    pub fn from_records(rows: &[serde_json::Value]) -> Result<Relation> {
        let mut cells: IndexMap<String, Vec<Value>> = IndexMap::new();
        for (i, row) in rows.iter().enumerate() {
            let obj = row
                .as_object()
                .ok_or_else(|| Error::Schema(format!("row {i} is not an object")))?;
            for (k, v) in obj {
                let col = cells
                    .entry(k.clone())
                    .or_insert_with(|| vec![Value::Null; i]);
                col.push(Value::from_json(v));
            }
            for col in cells.values_mut() {
                col.resize(i + 1, Value::Null);
            }
        }
        if cells.is_empty() {
            // Key-less records still count as rows.
            return Ok(Relation {
                columns: Vec::new(),
                nrows: rows.len(),
            });
        }
        Relation::new(
            cells
                .into_iter()
                .map(|(name, values)| Column::from_values(name, values))
                .collect(),
        )
    }

    /// Read a CSV file with a header row.
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Relation> {
        let file = std::fs::File::open(path.as_ref())?;
        Relation::from_csv_reader(file)
    }

    /// Read CSV from any reader. Empty fields and common NA tokens are null;
    /// each column is typed with [`DataType::infer`].
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Relation> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_owned).collect();
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for record in rdr.records() {
            let record = record?;
            for (c, col) in cells.iter_mut().enumerate() {
                let cell = record.get(c).unwrap_or("");
                let is_null = cell.trim().is_empty() || NULL_TOKENS.contains(&cell.trim());
                col.push(if is_null { None } else { Some(cell.to_owned()) });
            }
        }
        Relation::new(
            headers
                .into_iter()
                .zip(cells)
                .map(|(name, col)| Column::from_text(name, col))
                .collect(),
        )
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nrows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Cells of row `row`, in column order.
    pub fn row(&self, row: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| c.get(row)).collect()
    }

    /// New relation holding the rows at `rows`, in that order.
    pub fn take(&self, rows: &[usize]) -> Relation {
        Relation {
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            nrows: rows.len(),
        }
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Relation {
        let rows: Vec<usize> = (0..n.min(self.nrows)).collect();
        self.take(&rows)
    }

    /// Last `n` rows.
    pub fn tail(&self, n: usize) -> Relation {
        let rows: Vec<usize> = (self.nrows.saturating_sub(n)..self.nrows).collect();
        self.take(&rows)
    }

    /// Row-records in row order.
    pub fn to_records(&self) -> Vec<Record> {
        (0..self.nrows)
            .map(|r| {
                self.columns
                    .iter()
                    .map(|c| (c.name.clone(), c.get(r).to_json()))
                    .collect()
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Named relations in registration order. The first registered table is
/// the fallback for unresolved table references.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    tables: IndexMap<String, Relation>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register `relation` under `name`. Re-registering a name replaces the
    /// relation but keeps its original position.
    pub fn register(&mut self, name: impl Into<String>, relation: Relation) -> Option<Relation> {
        self.tables.insert(name.into(), relation)
    }

    pub fn get(&self, name: &str) -> Option<&Relation> {
        self.tables.get(name)
    }

    /// The first registered table.
    pub fn first(&self) -> Option<(&str, &Relation)> {
        self.tables.first().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> Vec<&str> {
        self.tables.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Relation)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Sum of row counts over all registered tables.
    pub fn total_rows(&self) -> usize {
        self.tables.values().map(Relation::nrows).sum()
    }
}

impl<S: Into<String>> FromIterator<(S, Relation)> for Registry {
    fn from_iter<I: IntoIterator<Item = (S, Relation)>>(iter: I) -> Self {
        Registry {
            tables: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_priority() {
        assert_eq!(DataType::infer(["1", "2", "-3"]), DataType::Int);
        assert_eq!(DataType::infer(["1", "2.5"]), DataType::Float);
        assert_eq!(
            DataType::infer(["2024-01-01", "2024-02-01 10:00:00"]),
            DataType::Datetime
        );
        assert_eq!(DataType::infer(["1", "abc"]), DataType::String);
        assert_eq!(DataType::infer(Vec::<&str>::new()), DataType::String);
    }

    #[test]
    fn mixed_values_widen() {
        let col = Column::from_values("x", vec![Value::Int(1), Value::Float(2.5), Value::Null]);
        assert_eq!(col.dtype(), DataType::Float);
        assert_eq!(col.get(0), &Value::Float(1.0));

        let col = Column::from_values("x", vec![Value::Int(1), Value::Str("a".into())]);
        assert_eq!(col.dtype(), DataType::String);
        assert_eq!(col.get(0), &Value::Str("1".into()));
    }

    #[test]
    fn integral_float_shares_int_key() {
        assert_eq!(Value::Float(3.0).key(), Value::Int(3).key());
        assert_ne!(Value::Float(3.5).key(), Value::Int(3).key());
    }

    #[test]
    fn keys_order_like_values() {
        let mut keys = vec![
            Value::Null.key(),
            Value::Str("b".into()).key(),
            Value::Float(2.5).key(),
            Value::Str("a".into()).key(),
            Value::Int(3).key(),
            Value::Int(-1).key(),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                Value::Int(-1).key(),
                Value::Float(2.5).key(),
                Value::Int(3).key(),
                Value::Str("a".into()).key(),
                Value::Str("b".into()).key(),
                Value::Null.key(),
            ]
        );
    }

    #[test]
    fn keyless_records_keep_row_count() {
        let rows = vec![serde_json::json!({}), serde_json::json!({})];
        let rel = Relation::from_records(&rows).unwrap();
        assert_eq!(rel.ncols(), 0);
        assert_eq!(rel.nrows(), 2);
        assert_eq!(rel.to_records().len(), 2);
        assert_eq!(rel.head(1).nrows(), 1);
    }

    #[test]
    fn ragged_columns_rejected() {
        let a = Column::from_values("a", vec![Value::Int(1)]);
        let b = Column::from_values("b", vec![Value::Int(1), Value::Int(2)]);
        assert!(matches!(Relation::new(vec![a, b]), Err(Error::Schema(_))));
    }

    #[test]
    fn records_fill_missing_keys() {
        let rows = vec![
            serde_json::json!({"a": 1}),
            serde_json::json!({"a": 2, "b": "x"}),
        ];
        let rel = Relation::from_records(&rows).unwrap();
        assert_eq!(rel.column_names(), vec!["a", "b"]);
        assert_eq!(rel.column("b").unwrap().get(0), &Value::Null);
        assert_eq!(rel.column("b").unwrap().get(1), &Value::Str("x".into()));
    }

    #[test]
    fn registry_keeps_insertion_order() {
        let mut reg = Registry::new();
        reg.register("b", Relation::default());
        reg.register("a", Relation::default());
        reg.register("b", Relation::default());
        assert_eq!(reg.names(), vec!["b", "a"]);
        assert_eq!(reg.first().map(|(n, _)| n), Some("b"));
    }
}
