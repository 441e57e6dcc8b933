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

//! Schema profiler: per-table column statistics plus cross-table key and
//! join hints, serialized as the context a plan author works from.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::config::ProfileConfig;
use crate::error::Result;
use crate::relation::{Column, DataType, Record, Registry, Relation, ValueKey};

/// Null share above which a column is flagged by [`quality_warnings`].
const HIGH_MISSING_RATIO: f64 = 0.5;
const MAX_COLUMNS: usize = 50;
const MIN_COLUMNS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMetadata {
    pub column_name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub null_count: usize,
    pub unique_count: usize,
    /// Distinct non-null values in first-appearance order.
    pub sample_values: Vec<Json>,
    /// Only for int/float/datetime columns with at least one value.
    pub min_value: Option<Json>,
    pub max_value: Option<Json>,
    /// `unique_count / row_count`, 0 for an empty table.
    pub distinct_value_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleData {
    pub head: Vec<Record>,
    pub tail: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableMetadata {
    /// Source name the table was registered under.
    pub file_name: String,
    pub table_name: String,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnMetadata>,
    pub sample_data: SampleData,
    pub primary_key_candidates: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Profile of a whole registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    /// Keyed by normalized table name.
    pub tables: IndexMap<String, TableMetadata>,
    /// table → `(local_column, "other_table.other_column")`.
    pub foreign_key_candidates: IndexMap<String, Vec<(String, String)>>,
    /// `(t1.column, t2.column, shared_type)`.
    pub joinable_columns: Vec<(String, String, DataType)>,
}

impl Metadata {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn table(&self, name: &str) -> Option<&TableMetadata> {
        self.tables.get(name)
    }
}

/// Derive a logical table name from a source name: the final extension is
/// dropped, the rest lowercased, and every run of non-alphanumeric
/// characters collapsed to one underscore.
///
/// `"Daily Sales (2024).csv"` → `"daily_sales_2024_"`.
pub fn normalize_table_name(source: &str) -> String {
    let base = source.rsplit_once('.').map_or(source, |(b, _)| b);
    let mut out = String::with_capacity(base.len());
    let mut in_run = false;
    for ch in base.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}

/// Profile every relation in `tables` and detect relationships between
/// them. Deterministic and infallible.
pub fn profile(tables: &Registry, config: &ProfileConfig) -> Metadata {
    let mut meta = Metadata::default();
    let mut named: Vec<(String, &Relation)> = Vec::with_capacity(tables.len());
    for (source, rel) in tables.iter() {
        let table = profile_table(source, rel, config);
        debug!(
            table = %table.table_name,
            rows = table.row_count,
            columns = table.column_count,
            "profiled table"
        );
        if meta.tables.contains_key(&table.table_name) {
            warn!(source, table = %table.table_name, "normalized table name collides; replacing");
            named.retain(|(n, _)| *n != table.table_name);
        }
        named.push((table.table_name.clone(), rel));
        meta.tables.insert(table.table_name.clone(), table);
    }
    meta.foreign_key_candidates = find_foreign_key_candidates(&named);
    meta.joinable_columns = find_joinable_columns(&named);
    meta
}

/// Metadata for one relation registered under `source`.
pub fn profile_table(source: &str, rel: &Relation, config: &ProfileConfig) -> TableMetadata {
    let warnings = if config.quality_checks {
        quality_warnings(rel)
    } else {
        Vec::new()
    };
    TableMetadata {
        file_name: source.to_owned(),
        table_name: normalize_table_name(source),
        row_count: rel.nrows(),
        column_count: rel.ncols(),
        columns: rel
            .columns()
            .iter()
            .map(|c| column_metadata(c, rel.nrows(), config.sample_values))
            .collect(),
        sample_data: SampleData {
            head: rel.head(config.sample_rows).to_records(),
            tail: rel.tail(config.sample_rows).to_records(),
        },
        primary_key_candidates: find_primary_key_candidates(rel),
        warnings,
    }
}

pub fn column_metadata(col: &Column, nrows: usize, max_samples: usize) -> ColumnMetadata {
    let mut seen = HashSet::new();
    let mut samples = Vec::new();
    for v in col.non_null() {
        if seen.insert(v.key()) && samples.len() < max_samples {
            samples.push(v.to_json());
        }
    }
    let unique_count = seen.len();
    let null_count = col.null_count();

    let (min_value, max_value) = if col.dtype().has_range() {
        (
            col.non_null().min_by(|a, b| a.total_cmp(b)).map(|v| v.to_json()),
            col.non_null().max_by(|a, b| a.total_cmp(b)).map(|v| v.to_json()),
        )
    } else {
        (None, None)
    };

    ColumnMetadata {
        column_name: col.name().to_owned(),
        data_type: col.dtype(),
        nullable: null_count > 0,
        null_count,
        unique_count,
        sample_values: samples,
        min_value,
        max_value,
        distinct_value_ratio: if nrows == 0 {
            0.0
        } else {
            unique_count as f64 / nrows as f64
        },
    }
}

/// Columns that are fully non-null and fully unique. Empty relations have
/// no candidates.
pub fn find_primary_key_candidates(rel: &Relation) -> Vec<String> {
    if rel.is_empty() {
        return Vec::new();
    }
    rel.columns()
        .iter()
        .filter(|c| c.null_count() == 0)
        .filter(|c| c.values().iter().map(|v| v.key()).collect::<HashSet<_>>().len() == rel.nrows())
        .map(|c| c.name().to_owned())
        .collect()
}

fn value_set(col: &Column) -> HashSet<ValueKey> {
    col.non_null().map(|v| v.key()).collect()
}

/// For every ordered pair of distinct tables, report `t1.col1 →
/// t2.col2` when the non-null values of `col1` form a strict, non-empty
/// subset of those of `col2`.
///
/// Cost is O(T² · C²) set comparisons for T tables of C columns each;
/// callers profiling very wide inputs should bound them first.
pub fn find_foreign_key_candidates(
    tables: &[(String, &Relation)],
) -> IndexMap<String, Vec<(String, String)>> {
    let sets: Vec<Vec<(&str, HashSet<ValueKey>)>> = tables
        .iter()
        .map(|(_, rel)| {
            rel.columns()
                .iter()
                .map(|c| (c.name(), value_set(c)))
                .collect()
        })
        .collect();

    let mut out = IndexMap::with_capacity(tables.len());
    for (i, (t1, _)) in tables.iter().enumerate() {
        let mut found = Vec::new();
        for (col1, vals1) in &sets[i] {
            if vals1.is_empty() {
                continue;
            }
            for (j, (t2, _)) in tables.iter().enumerate() {
                if i == j {
                    continue;
                }
                for (col2, vals2) in &sets[j] {
                    if vals1.len() < vals2.len() && vals1.is_subset(vals2) {
                        found.push(((*col1).to_owned(), format!("{t2}.{col2}")));
                    }
                }
            }
        }
        out.insert(t1.clone(), found);
    }
    out
}

/// Same-named columns with identical inferred type across each unordered
/// pair of tables (the lexicographically smaller table name comes first).
pub fn find_joinable_columns(tables: &[(String, &Relation)]) -> Vec<(String, String, DataType)> {
    let mut out = Vec::new();
    for (t1, r1) in tables {
        for (t2, r2) in tables {
            if t1 >= t2 {
                continue;
            }
            for c1 in r1.columns() {
                if let Some(c2) = r2.column(c1.name()) {
                    if c1.dtype() == c2.dtype() {
                        out.push((
                            format!("{t1}.{}", c1.name()),
                            format!("{t2}.{}", c2.name()),
                            c1.dtype(),
                        ));
                    }
                }
            }
        }
    }
    out
}

/// Non-fatal data-quality findings for one relation.
pub fn quality_warnings(rel: &Relation) -> Vec<String> {
    let mut warnings = Vec::new();
    if rel.is_empty() {
        warnings.push("table contains no data rows".to_owned());
        return warnings;
    }

    let threshold = rel.nrows() as f64 * HIGH_MISSING_RATIO;
    let sparse: Vec<&str> = rel
        .columns()
        .iter()
        .filter(|c| c.null_count() as f64 > threshold)
        .map(Column::name)
        .collect();
    if !sparse.is_empty() {
        warnings.push(format!(
            "high missing values (>50%) in columns: {}",
            sparse.join(", ")
        ));
    }

    let mut seen = HashSet::with_capacity(rel.nrows());
    let duplicates = (0..rel.nrows())
        .filter(|&r| {
            let key: Vec<ValueKey> = rel.row(r).into_iter().map(|v| v.key()).collect();
            !seen.insert(key)
        })
        .count();
    if duplicates > 0 {
        warnings.push(format!("found {duplicates} duplicate rows"));
    }

    if rel.ncols() > MAX_COLUMNS {
        warnings.push(format!(
            "large number of columns ({}); verify the source format",
            rel.ncols()
        ));
    }
    if rel.ncols() < MIN_COLUMNS {
        warnings.push("very few columns; verify the data is structured correctly".to_owned());
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_name_normalization() {
        assert_eq!(normalize_table_name("Sales Data.csv"), "sales_data");
        assert_eq!(normalize_table_name("orders--2024__Q1.CSV"), "orders_2024_q1");
        assert_eq!(normalize_table_name("archive.tar.gz"), "archive_tar");
        assert_eq!(normalize_table_name("plain"), "plain");
    }

    #[test]
    fn quality_checks() {
        let rel = Relation::from_records(&[
            serde_json::json!({"a": 1, "b": null}),
            serde_json::json!({"a": 1, "b": null}),
            serde_json::json!({"a": 2, "b": 3}),
        ])
        .unwrap();
        let w = quality_warnings(&rel);
        assert_eq!(
            w,
            vec![
                "high missing values (>50%) in columns: b".to_string(),
                "found 1 duplicate rows".to_string(),
            ]
        );
        assert_eq!(
            quality_warnings(&Relation::default()),
            vec!["table contains no data rows".to_string()]
        );
    }
}
