//! End-to-end executor behavior through the public API.

use std::sync::Arc;
use std::time::{Duration, Instant};

use analytics_athena::mock::{Script, ScriptedBackend};
use analytics_athena::*;

fn executor_with(backend: Arc<ScriptedBackend>) -> QueryExecutor {
    QueryExecutor::new(
        backend,
        "ecommerce_analytics_db",
        "s3://analytics-test/results/",
        PollPolicy::from_millis(10, 5),
    )
}

#[tokio::test]
async fn header_plus_k_rows_decode_to_k_mappings() {
    let sql = "SELECT nombre, precio FROM productos";
    let backend = Arc::new(ScriptedBackend::new().with_script(
        sql,
        Script::succeeded(ResultSet::from_strings(vec![
            vec!["nombre", "precio"],
            vec!["Mouse", "19.90"],
            vec!["Teclado", "45.00"],
            vec!["Monitor", "210.50"],
        ]))
        .after_polls(1),
    ));

    let result = executor_with(backend).run(sql).await;
    let (rows, reason) = result.into_parts();

    assert_eq!(reason, None);
    assert_eq!(rows.len(), 3);
    for row in &rows {
        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["nombre", "precio"]);
    }
    assert_eq!(rows[2]["nombre"].as_deref(), Some("Monitor"));
}

#[tokio::test]
async fn header_only_is_empty_success() {
    let sql = "SELECT * FROM productos WHERE 1 = 0";
    let backend = Arc::new(ScriptedBackend::new().with_script(
        sql,
        Script::succeeded(ResultSet::from_strings(vec![vec!["id_producto", "nombre"]])),
    ));

    let result = executor_with(backend).run(sql).await;

    assert!(result.is_success());
    assert!(result.rows().is_empty());
    assert_eq!(result.error_reason(), None);
}

#[tokio::test]
async fn syntax_error_reason_is_reported() {
    let backend = Arc::new(ScriptedBackend::new().with_script(
        "SELEC nombre FROM productos",
        Script::failed(Some("Syntax error: line 1:1: mismatched input 'SELEC'")),
    ));

    let (rows, reason) = executor_with(backend)
        .run("SELEC nombre FROM productos")
        .await
        .into_parts();

    assert!(rows.is_empty());
    assert!(reason.expect("reason").contains("Syntax error"));
}

#[tokio::test]
async fn missing_reason_falls_back_to_generic_text() {
    let backend = Arc::new(ScriptedBackend::new().with_fallback(Script::failed(None)));

    let reason = executor_with(backend)
        .run("SELECT 1")
        .await
        .error_reason()
        .expect("reason");

    assert!(!reason.is_empty());
    assert!(reason.contains(UNKNOWN_FAILURE_REASON));
}

#[tokio::test]
async fn never_leaving_running_times_out_after_three_polls() {
    let backend = Arc::new(ScriptedBackend::new().with_fallback(Script::running_forever()));
    let exec = executor_with(backend.clone());

    let started = Instant::now();
    let result = exec
        .execute(exec.request("SELECT 1"), PollPolicy::from_millis(3, 10))
        .await;

    let handle = result.handle.clone().expect("submitted");
    assert!(matches!(result.error(), Some(QueryError::Timeout { attempts: 3, .. })));
    assert_eq!(backend.poll_count(&handle), 3);
    // Two sleeps between three polls.
    assert!(started.elapsed() >= Duration::from_millis(20));
}

#[tokio::test]
async fn short_rows_pad_with_null() {
    let sql = "SELECT a, b, c FROM t";
    let backend = Arc::new(ScriptedBackend::new().with_script(
        sql,
        Script::succeeded(ResultSet::new(vec![
            vec![Some("a".into()), Some("b".into()), Some("c".into())],
            vec![Some("1".into()), Some("2".into())],
        ])),
    ));

    let result = executor_with(backend).run(sql).await;

    let row = &result.rows()[0];
    assert_eq!(row.len(), 3);
    assert_eq!(row["c"], None);
    let json = serde_json::to_value(row).unwrap();
    assert_eq!(json, serde_json::json!({"a": "1", "b": "2", "c": null}));
}

#[tokio::test]
async fn run_in_targets_another_database() {
    let backend = Arc::new(
        ScriptedBackend::new().with_fallback(Script::succeeded(ResultSet::default())),
    );
    let exec = executor_with(backend.clone());

    exec.run_in("SHOW TABLES", "staging_db").await;
    exec.run("SHOW TABLES").await;

    let submitted = backend.submitted();
    assert_eq!(submitted[0].database_name(), "staging_db");
    assert_eq!(submitted[1].database_name(), "ecommerce_analytics_db");
    assert_eq!(submitted[0].result_location(), "s3://analytics-test/results/");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parallel_queries_keep_their_own_results() {
    let products = "SELECT nombre FROM productos LIMIT 2";
    let warehouses = "SELECT tipo, total FROM almacenes";
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_script(
                products,
                Script::succeeded(ResultSet::from_strings(vec![
                    vec!["nombre"],
                    vec!["Mouse"],
                    vec!["Teclado"],
                ]))
                .after_polls(4),
            )
            .with_script(
                warehouses,
                Script::succeeded(ResultSet::from_strings(vec![
                    vec!["tipo", "total"],
                    vec!["central", "12"],
                ]))
                .after_polls(2),
            ),
    );
    let exec = executor_with(backend);

    let a = tokio::spawn({
        let exec = exec.clone();
        async move { exec.run(products).await }
    });
    let b = tokio::spawn({
        let exec = exec.clone();
        async move { exec.run(warehouses).await }
    });
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    assert_ne!(a.handle, b.handle);
    assert_eq!(a.rows().len(), 2);
    assert!(a.rows().iter().all(|r| r.keys().map(String::as_str).eq(["nombre"])));
    assert_eq!(b.rows().len(), 1);
    assert_eq!(b.rows()[0]["tipo"].as_deref(), Some("central"));
    assert!(!b.rows()[0].contains_key("nombre"));
}
