//! Tests for QueryResult accessors and table rendering.

use std::sync::Arc;

use analytics_athena::mock::{Script, ScriptedBackend};
use analytics_athena::*;

#[tokio::test]
async fn result_records_request_and_timing() {
    let backend = Arc::new(ScriptedBackend::new().with_fallback(Script::succeeded(
        ResultSet::from_strings(vec![vec!["total_productos"], vec!["42"]]),
    )));
    let exec = QueryExecutor::new(backend, "db", "s3://b/out/", PollPolicy::from_millis(2, 1));

    let result = exec.run("SELECT COUNT(*) AS total_productos FROM productos").await;

    assert_eq!(
        result.request.sql_text(),
        "SELECT COUNT(*) AS total_productos FROM productos"
    );
    assert!(result.finished_at >= result.started_at);
    assert!(result.elapsed_ms() >= 0);

    let table = RowTable(result.rows()).to_string();
    assert!(table.contains("total_productos"));
    assert!(table.contains("42"));
    assert!(table.ends_with("(1 rows)"));
}

#[tokio::test]
async fn failed_result_has_no_rows() {
    let backend = Arc::new(ScriptedBackend::new().with_fallback(Script::cancelled()));
    let exec = QueryExecutor::new(backend, "db", "s3://b/out/", PollPolicy::from_millis(2, 1));

    let result = exec.run("SELECT 1").await;

    assert!(!result.is_success());
    assert!(result.rows().is_empty());
    assert_eq!(result.error().map(QueryError::kind), Some("execution"));
}

#[test]
fn result_set_row_counts() {
    let set = ResultSet::from_strings(vec![vec!["a"], vec!["1"], vec!["2"]]);
    assert_eq!(set.data_row_count(), 2);
    assert_eq!(set.decode().len(), 2);
    assert_eq!(ResultSet::default().data_row_count(), 0);
}
