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

//! Integration tests for plan execution: every plan shape, per-operation
//! error isolation, batch-fatal failures and the limit/order guarantees.

use serde_json::{json, Value as Json};

use tabplan::{
    execute, ExecConfig, Executor, OperationResult, PlanOutcome, Registry, Relation,
};

// ---------------------------------------------------------------------------
// Test data helpers
// ---------------------------------------------------------------------------

const SALES_CSV: &str = "\
loc,amt,qty,day
NYC,100,1,2024-01-01
NYC,200,,2024-01-02
LA,50,3,2024-01-02
,10,4,2024-01-03
";

const STORES_CSV: &str = "\
loc,manager,opened
NYC,ann,2019
LA,bob,2021
SF,cyd,2023
";

fn sales() -> Relation {
    Relation::from_csv_reader(SALES_CSV.as_bytes()).unwrap()
}

fn registry() -> Registry {
    let mut tables = Registry::new();
    tables.register("sales", sales());
    tables.register(
        "stores",
        Relation::from_csv_reader(STORES_CSV.as_bytes()).unwrap(),
    );
    tables
}

fn ok<'a>(outcome: &'a PlanOutcome, key: &str) -> &'a OperationResult {
    let op = outcome
        .operation(key)
        .unwrap_or_else(|| panic!("missing result '{key}'"));
    op.result()
        .unwrap_or_else(|| panic!("'{key}' failed: {:?}", op.error()))
}

fn err<'a>(outcome: &'a PlanOutcome, key: &str) -> &'a str {
    outcome
        .operation(key)
        .and_then(|o| o.error())
        .unwrap_or_else(|| panic!("'{key}' did not fail"))
}

fn column(res: &OperationResult, name: &str) -> Vec<Json> {
    res.data.iter().map(|r| r[name].clone()).collect()
}

fn floats(res: &OperationResult, name: &str) -> Vec<f64> {
    res.data
        .iter()
        .map(|r| r[name].as_f64().unwrap_or(f64::NAN))
        .collect()
}

// ---------------------------------------------------------------------------
// Aggregations list
// ---------------------------------------------------------------------------

#[test]
fn group_sort_limit() {
    let tables = registry();
    let plan = json!({"aggregations": [{
        "table": "sales",
        "group_by": ["loc"],
        "aggregate": {"amt": ["sum"]},
        "sort": {"column": "amt_sum", "ascending": false},
        "limit": 1
    }]});
    let outcome = execute(&plan, &tables);
    assert!(outcome.success);
    let res = ok(&outcome, "aggregation_1");
    assert_eq!(res.data.len(), 1);
    assert_eq!(res.data[0]["loc"], json!("NYC"));
    assert_eq!(res.data[0]["amt_sum"], json!(300));
    assert_eq!(res.summary.rows, 1);
    assert_eq!(res.summary.columns, vec!["loc", "amt_sum"]);
    assert_eq!(res.summary.operation, "aggregation");
    assert!(res.summary.warnings.is_empty());
}

#[test]
fn filter_greater_than() {
    let tables = registry();
    let plan = json!({"aggregations": [{
        "table": "sales",
        "filters": [{"column": "amt", "operator": ">", "value": 75}]
    }]});
    let outcome = execute(&plan, &tables);
    let res = ok(&outcome, "aggregation_1");
    assert_eq!(column(res, "amt"), vec![json!(100), json!(200)]);
    assert_eq!(column(res, "loc"), vec![json!("NYC"), json!("NYC")]);
}

#[test]
fn filters_are_conjunctive() {
    let tables = registry();
    let plan = json!({"aggregations": [{
        "table": "sales",
        "filters": [
            {"column": "amt", "operator": ">=", "value": 50},
            {"column": "loc", "operator": "!=", "value": "NYC"}
        ]
    }]});
    let outcome = execute(&plan, &tables);
    let res = ok(&outcome, "aggregation_1");
    assert_eq!(column(res, "loc"), vec![json!("LA")]);
}

#[test]
fn filter_in_list_and_default_operator() {
    let tables = registry();
    let plan = json!({"aggregations": [
        {"table": "sales", "filters": [{"column": "amt", "operator": "in", "value": [10, 50]}]},
        {"table": "sales", "filters": [{"column": "loc", "value": "LA"}]}
    ]});
    let outcome = execute(&plan, &tables);
    assert_eq!(column(ok(&outcome, "aggregation_1"), "amt"), vec![json!(50), json!(10)]);
    assert_eq!(column(ok(&outcome, "aggregation_2"), "amt"), vec![json!(50)]);
}

#[test]
fn filter_on_datetime_column() {
    let tables = registry();
    let plan = json!({"aggregations": [{
        "table": "sales",
        "filters": [{"column": "day", "operator": ">=", "value": "2024-01-02"}],
        "aggregate": {"amt": "sum"}
    }]});
    let outcome = execute(&plan, &tables);
    let res = ok(&outcome, "aggregation_1");
    assert_eq!(res.data[0]["amt_sum"], json!(260));
}

#[test]
fn unknown_table_falls_back_with_warning() {
    let tables = registry();
    let plan = json!({"aggregations": [{"table": "unknown_table", "aggregate": {"amt": "max"}}]});
    let outcome = execute(&plan, &tables);
    assert!(outcome.success);
    let res = ok(&outcome, "aggregation_1");
    assert_eq!(res.data[0]["amt_max"], json!(200));
    assert_eq!(res.summary.warnings.len(), 1);
    assert!(res.summary.warnings[0].contains("unknown_table"));
    assert!(res.summary.warnings[0].contains("sales"));
}

#[test]
fn missing_table_key_uses_first_table() {
    let tables = registry();
    let plan = json!({"aggregations": [{"aggregate": {"qty": "count"}}]});
    let outcome = execute(&plan, &tables);
    let res = ok(&outcome, "aggregation_1");
    assert_eq!(res.data[0]["qty_count"], json!(3));
    assert!(res.summary.warnings[0].contains("no table specified"));
}

#[test]
fn unknown_columns_are_skipped() {
    let tables = registry();
    let plan = json!({"aggregations": [{
        "table": "sales",
        "filters": [{"column": "nope", "operator": "==", "value": 1}],
        "group_by": ["loc", "ghost"],
        "aggregate": {"amt": ["sum"], "phantom": ["max"]},
        "sort": {"column": "missing"}
    }]});
    let outcome = execute(&plan, &tables);
    let res = ok(&outcome, "aggregation_1");
    assert_eq!(res.summary.columns, vec!["loc", "amt_sum"]);
    assert_eq!(res.data.len(), 2);
    assert_eq!(res.summary.warnings.len(), 4);
}

#[test]
fn multiple_functions_and_grouped_naming() {
    let tables = registry();
    let plan = json!({"aggregations": [{
        "table": "sales",
        "group_by": "loc",
        "aggregate": {"amt": ["mean", "count", "min"], "qty": "max"}
    }]});
    let outcome = execute(&plan, &tables);
    let res = ok(&outcome, "aggregation_1");
    assert_eq!(
        res.summary.columns,
        vec!["loc", "amt_mean", "amt_count", "amt_min", "qty_max"]
    );
    // Groups come out in key order; the null-keyed row is dropped.
    assert_eq!(column(res, "loc"), vec![json!("LA"), json!("NYC")]);
    assert_eq!(floats(res, "amt_mean"), vec![50.0, 150.0]);
    assert_eq!(column(res, "amt_count"), vec![json!(1), json!(2)]);
    assert_eq!(column(res, "qty_max"), vec![json!(3), json!(1)]);
}

#[test]
fn group_by_without_aggregate_passes_rows_through() {
    let tables = registry();
    let plan = json!({"aggregations": [{"table": "sales", "group_by": ["loc"]}]});
    let outcome = execute(&plan, &tables);
    let res = ok(&outcome, "aggregation_1");
    assert_eq!(res.data.len(), 4);
    assert_eq!(res.summary.warnings.len(), 1);
}

#[test]
fn sort_puts_nulls_last() {
    let tables = registry();
    let plan = json!({"aggregations": [
        {"table": "sales", "sort": {"column": "qty", "ascending": true}},
        {"table": "sales", "sort": [{"column": "qty", "ascending": false}]}
    ]});
    let outcome = execute(&plan, &tables);
    assert_eq!(
        column(ok(&outcome, "aggregation_1"), "qty"),
        vec![json!(1), json!(3), json!(4), Json::Null]
    );
    assert_eq!(
        column(ok(&outcome, "aggregation_2"), "qty"),
        vec![json!(4), json!(3), json!(1), Json::Null]
    );
}

#[test]
fn invalid_sort_is_ignored_with_warning() {
    let tables = registry();
    let plan = json!({"aggregations": [{"table": "sales", "sort": "amt"}]});
    let outcome = execute(&plan, &tables);
    let res = ok(&outcome, "aggregation_1");
    assert_eq!(column(res, "amt"), vec![json!(100), json!(200), json!(50), json!(10)]);
    assert_eq!(res.summary.warnings, vec!["invalid sort config ignored"]);
}

#[test]
fn custom_type_label() {
    let tables = registry();
    let plan = json!({"aggregations": [{"table": "stores", "type": "listing"}]});
    let outcome = execute(&plan, &tables);
    assert_eq!(ok(&outcome, "aggregation_1").summary.operation, "listing");
}

#[test]
fn limit_bounds_row_count() {
    let tables = registry();
    for n in 0..6usize {
        let plan = json!({"aggregations": [{"table": "sales", "limit": n}]});
        let outcome = execute(&plan, &tables);
        let res = ok(&outcome, "aggregation_1");
        assert_eq!(res.summary.rows, n.min(4));
        assert_eq!(res.data.len(), res.summary.rows);
    }
}

// ---------------------------------------------------------------------------
// Per-operation errors
// ---------------------------------------------------------------------------

#[test]
fn errors_stay_local_to_their_operation() {
    let tables = registry();
    let plan = json!({"aggregations": [
        "not an object",
        {"table": "sales", "aggregate": {"amt": "percentile"}},
        {"table": "sales", "aggregate": {"loc": "sum"}},
        {"table": "sales", "limit": -1},
        {"table": "sales", "filters": [{"column": "amt", "operator": "in", "value": 5}]},
        {"table": "sales", "aggregate": {"amt": "sum"}}
    ]});
    let outcome = execute(&plan, &tables);
    assert!(outcome.success);
    assert_eq!(outcome.results.len(), 6);
    assert!(err(&outcome, "aggregation_1").contains("malformed operation"));
    assert!(err(&outcome, "aggregation_2").contains("percentile"));
    assert!(err(&outcome, "aggregation_3").contains("type error"));
    assert!(err(&outcome, "aggregation_4").contains("limit"));
    assert!(err(&outcome, "aggregation_5").contains("malformed operation"));
    assert_eq!(ok(&outcome, "aggregation_6").data[0]["amt_sum"], json!(360));
    assert_eq!(outcome.error_count(), 5);
    assert_eq!(outcome.execution_metadata.operations_executed, 6);
}

#[test]
fn unresolvable_table_with_empty_registry() {
    let tables = Registry::new();
    let plan = json!({"aggregations": [{"table": "sales"}]});
    let outcome = execute(&plan, &tables);
    assert!(outcome.success);
    assert!(err(&outcome, "aggregation_1").contains("no valid table found"));
    assert_eq!(outcome.execution_metadata.tables_processed, 0);
}

#[test]
fn unknown_operator_is_skipped() {
    let tables = registry();
    let plan = json!({"aggregations": [{
        "table": "sales",
        "filters": [{"column": "amt", "operator": "~=", "value": 1}]
    }]});
    let outcome = execute(&plan, &tables);
    let res = ok(&outcome, "aggregation_1");
    assert_eq!(res.data.len(), 4);
    assert!(res.summary.warnings[0].contains("~="));
}

// ---------------------------------------------------------------------------
// Other shapes
// ---------------------------------------------------------------------------

#[test]
fn operations_list() {
    let tables = registry();
    let plan = json!({"operations": [
        {"table": "stores", "sort": {"column": "opened", "ascending": false}, "limit": 2},
        {"table": "sales", "aggregate": {"amt": ["median", "std"]}}
    ]});
    let outcome = execute(&plan, &tables);
    assert!(outcome.success);
    let keys: Vec<&str> = outcome.results.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["operation_1", "operation_2"]);
    assert_eq!(
        column(ok(&outcome, "operation_1"), "loc"),
        vec![json!("SF"), json!("LA")]
    );
    let res = ok(&outcome, "operation_2");
    assert_eq!(floats(res, "amt_median"), vec![75.0]);
    let std = floats(res, "amt_std")[0];
    assert!((std - 82.056_890_833_941_14).abs() < 1e-9);
}

#[test]
fn table_keyed_plan() {
    let tables = registry();
    let plan = json!({"tables": {
        "sales": [
            {"aggregate": {"amt": "sum"}},
            {"table": "stores", "limit": 1}
        ],
        "nowhere": [{"limit": 1}],
        "stores": [{"aggregate": {"manager": "nunique"}}]
    }});
    let outcome = execute(&plan, &tables);
    assert!(outcome.success);
    let keys: Vec<&str> = outcome.results.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["sales", "stores"]);

    let step1 = outcome.step("sales", "step_1").and_then(|o| o.result()).unwrap();
    assert_eq!(step1.data[0]["amt_sum"], json!(360));
    // Steps are bound to their enclosing table.
    let step2 = outcome.step("sales", "step_2").and_then(|o| o.result()).unwrap();
    assert_eq!(step2.summary.columns, vec!["loc", "amt", "qty", "day"]);
    assert_eq!(step2.summary.warnings.len(), 1);

    let stores = outcome.step("stores", "step_1").and_then(|o| o.result()).unwrap();
    assert_eq!(stores.data[0]["manager_nunique"], json!(3));
    assert_eq!(outcome.execution_metadata.operations_executed, 3);
}

#[test]
fn table_keyed_plan_ignores_entries_of_unknown_tables() {
    let tables = registry();
    let plan = json!({"tables": {"sales": [{"limit": 1}], "ghost": "oops"}});
    let outcome = execute(&plan, &tables);
    assert!(outcome.success, "{:?}", outcome.error);
    let keys: Vec<&str> = outcome.results.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["sales"]);
    let step = outcome.step("sales", "step_1").and_then(|o| o.result()).unwrap();
    assert_eq!(step.summary.rows, 1);
}

#[test]
fn table_keyed_plan_with_malformed_registered_table_keeps_earlier_results() {
    let tables = registry();
    let plan = json!({"tables": {"sales": [{"limit": 1}], "stores": "oops"}});
    let outcome = execute(&plan, &tables);
    assert!(!outcome.success);
    assert!(outcome.error.as_deref().unwrap().contains("'stores' must be a list"));
    assert!(outcome.step("sales", "step_1").is_some());
}

#[test]
fn flexible_plan_describes_first_table() {
    let tables = registry();
    let outcome = execute(&json!({"note": "anything"}), &tables);
    assert!(outcome.success);
    let res = ok(&outcome, "main_aggregation");
    assert_eq!(res.summary.operation, "flexible_execution");
    assert_eq!(res.summary.columns, vec!["statistic", "amt", "qty"]);
    assert_eq!(
        column(res, "statistic"),
        vec![
            json!("count"),
            json!("mean"),
            json!("std"),
            json!("min"),
            json!("25%"),
            json!("50%"),
            json!("75%"),
            json!("max")
        ]
    );
    assert_eq!(floats(res, "qty")[0], 3.0);
    assert_eq!(floats(res, "amt")[1], 90.0);
}

#[test]
fn flexible_plan_with_aggregation_runs_as_operation() {
    let tables = registry();
    let plan = json!({"groupby": ["loc"], "agg_functions": {"amt": "max"}});
    let outcome = execute(&plan, &tables);
    let res = ok(&outcome, "main_aggregation");
    assert_eq!(res.summary.operation, "flexible_execution");
    assert_eq!(column(res, "loc"), vec![json!("LA"), json!("NYC")]);
    assert_eq!(column(res, "amt_max"), vec![json!(50), json!(200)]);
    assert!(res.summary.warnings.is_empty());
    assert_eq!(outcome.execution_metadata.operations_executed, 1);
}

#[test]
fn flexible_plan_runs_on_first_table() {
    let tables = registry();
    let plan = json!({"table": "stores", "filters": [{"column": "loc", "value": "LA"}]});
    let outcome = execute(&plan, &tables);
    let res = ok(&outcome, "main_aggregation");
    assert_eq!(res.summary.columns, vec!["loc", "amt", "qty", "day"]);
    assert_eq!(column(res, "amt"), vec![json!(50)]);
    assert_eq!(res.summary.warnings.len(), 1);
    assert!(res.summary.warnings[0].contains("stores"));
    assert!(res.summary.warnings[0].contains("sales"));
}

#[test]
fn empty_aggregations_list() {
    let tables = registry();
    let outcome = execute(&json!({"aggregations": []}), &tables);
    assert!(outcome.success);
    assert!(outcome.results.is_empty());
    assert_eq!(outcome.execution_metadata.tables_processed, 2);
    assert_eq!(outcome.execution_metadata.total_rows_processed, 7);
}

// ---------------------------------------------------------------------------
// Batch-fatal errors
// ---------------------------------------------------------------------------

#[test]
fn non_object_plan_fails_batch() {
    let tables = registry();
    let outcome = execute(&json!([1, 2, 3]), &tables);
    assert!(!outcome.success);
    assert!(outcome.error.as_deref().unwrap().contains("malformed plan"));
    assert!(outcome.results.is_empty());
}

#[test]
fn wrong_kind_for_dispatch_key_fails_batch() {
    let tables = registry();
    for plan in [
        json!({"aggregations": {"table": "sales"}}),
        json!({"operations": "all"}),
        json!({"tables": ["sales"]}),
        json!({"tables": {"sales": {"limit": 1}}}),
    ] {
        let outcome = execute(&plan, &tables);
        assert!(!outcome.success, "{plan}");
        assert!(outcome.error.is_some());
    }
}

#[test]
fn flexible_plan_without_tables_fails_batch() {
    let tables = Registry::new();
    let outcome = execute(&json!({"group_by": "x"}), &tables);
    assert!(!outcome.success);
    assert!(outcome.error.is_some());
}

// ---------------------------------------------------------------------------
// Serialization and parallelism
// ---------------------------------------------------------------------------

#[test]
fn outcome_serializes_to_expected_shape() {
    let tables = registry();
    let plan = json!({"aggregations": [
        {"table": "sales", "aggregate": {"amt": "sum"}},
        {"table": "sales", "aggregate": {"loc": "mean"}}
    ]});
    let outcome = execute(&plan, &tables);
    let v = serde_json::to_value(&outcome).unwrap();
    assert_eq!(v["success"], json!(true));
    assert_eq!(
        v["results"]["aggregation_1"],
        json!({
            "data": [{"amt_sum": 360}],
            "summary": {"rows": 1, "columns": ["amt_sum"], "operation": "aggregation"}
        })
    );
    assert!(v["results"]["aggregation_2"]["error"].is_string());
    assert_eq!(
        v["execution_metadata"],
        json!({"tables_processed": 2, "operations_executed": 2, "total_rows_processed": 7})
    );
    assert!(v.get("error").is_none());
}

#[test]
fn parallel_matches_sequential() {
    let tables = registry();
    let entries: Vec<Json> = (0..16)
        .map(|i| {
            json!({
                "table": if i % 2 == 0 { "sales" } else { "stores" },
                "limit": i % 5,
                "sort": {"column": "loc", "ascending": i % 3 == 0}
            })
        })
        .collect();
    let plan = json!({ "operations": entries });
    let sequential = Executor::new(&tables).execute(&plan);
    let parallel = Executor::new(&tables)
        .with_config(ExecConfig { parallel: true })
        .execute(&plan);
    assert_eq!(sequential, parallel);
}

#[test]
fn execution_is_deterministic() {
    let tables = registry();
    let plan = json!({"aggregations": [
        {"table": "sales", "group_by": ["loc"], "aggregate": {"amt": ["sum", "var"]}}
    ]});
    let a = serde_json::to_string(&execute(&plan, &tables)).unwrap();
    let b = serde_json::to_string(&execute(&plan, &tables)).unwrap();
    assert_eq!(a, b);
}
