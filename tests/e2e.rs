use livy_notebook::{ErrorKind, Notebook, NotebookConfig, ResultKind, SourceKind};
use serde_json::json;
use std::time::Duration;
use tokio_test::assert_ok;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> NotebookConfig {
    let mut config = NotebookConfig::new(server.uri());
    config.execution.poll_interval = Duration::from_millis(10);
    config.execution.session_create_timeout = Duration::from_secs(5);
    config.execution.statement_timeout = Duration::from_secs(10);
    config
}

async fn version(server: &MockServer, version: &str) {
    Mock::given(method("GET"))
        .and(path("/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": version})))
        .mount(server)
        .await;
}

/// A session that is idle on its first poll
async fn session(server: &MockServer, id: u64, kind: &str, creations: u64) {
    Mock::given(method("POST"))
        .and(path("/sessions"))
        .and(body_partial_json(json!({"kind": kind})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": id,
            "state": "starting",
            "kind": kind
        })))
        .expect(creations)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/sessions/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "state": "idle",
            "kind": kind
        })))
        .mount(server)
        .await;
}

async fn submit(server: &MockServer, session: u64, statement: u64, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(format!("/sessions/{}/statements", session)))
        .and(body_partial_json(body))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": statement,
            "state": "waiting"
        })))
        .mount(server)
        .await;
}

async fn available(server: &MockServer, session: u64, statement: u64, output: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/sessions/{}/statements/{}", session, statement)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": statement,
            "state": "available",
            "output": output
        })))
        .mount(server)
        .await;
}

async fn running(server: &MockServer, session: u64, statement: u64, times: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/sessions/{}/statements/{}", session, statement)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": statement,
            "state": "running"
        })))
        .up_to_n_times(times)
        .mount(server)
        .await;
}

async fn deleted(server: &MockServer, session: u64) {
    Mock::given(method("DELETE"))
        .and(path(format!("/sessions/{}", session)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"msg": "deleted"})))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_scala_and_sql_share_a_session() {
    let server = MockServer::start().await;
    version(&server, "0.7.1-incubating").await;
    session(&server, 0, "spark", 1).await;

    submit(&server, 0, 2, json!({"kind": "sql"})).await;
    submit(&server, 0, 0, json!({"code": "val x = 1"})).await;
    submit(&server, 0, 1, json!({"code": "x + 1"})).await;
    available(&server, 0, 0, json!({
        "status": "ok",
        "execution_count": 0,
        "data": {"text/plain": "x: Int = 1"}
    }))
    .await;
    running(&server, 0, 1, 2).await;
    available(&server, 0, 1, json!({
        "status": "ok",
        "execution_count": 1,
        "data": {"text/plain": "res0: Int = 2"}
    }))
    .await;
    available(&server, 0, 2, json!({
        "status": "ok",
        "execution_count": 2,
        "data": {"application/json": {
            "schema": {"type": "struct", "fields": [{"name": "one", "type": "integer"}]},
            "data": [[1]]
        }}
    }))
    .await;
    deleted(&server, 0).await;

    let notebook = Notebook::connect(config(&server)).await.unwrap();
    assert!(!notebook.is_shared());

    let run = notebook.run(SourceKind::Scala, "val x = 1\n\nx + 1\n").await;
    assert!(run.is_success());
    let texts: Vec<_> = run.results.iter().map(|r| r.data()).collect();
    assert_eq!(texts, vec!["x: Int = 1", "res0: Int = 2"]);

    let run = notebook.run(SourceKind::Sql, "select 1 as one").await;
    assert!(run.is_success());
    assert_eq!(run.results.len(), 1);
    assert_eq!(run.results[0].kind, ResultKind::Table);
    assert_eq!(run.results[0].data(), "one\n1");

    assert_ok!(notebook.close().await);
}

#[tokio::test]
async fn test_python_error_stops_the_block() {
    let server = MockServer::start().await;
    version(&server, "0.5.0").await;
    session(&server, 3, "pyspark", 1).await;

    Mock::given(method("POST"))
        .and(path("/sessions/3/statements"))
        .and(body_partial_json(json!({"code": "print(2)"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 2, "state": "waiting"})))
        .expect(0)
        .mount(&server)
        .await;
    submit(&server, 3, 0, json!({"code": "x = 1"})).await;
    submit(&server, 3, 1, json!({"code": "print(y)"})).await;
    available(&server, 3, 0, json!({
        "status": "ok",
        "execution_count": 0,
        "data": {"text/plain": ""}
    }))
    .await;
    running(&server, 3, 1, 2).await;
    available(&server, 3, 1, json!({
        "status": "error",
        "execution_count": 1,
        "ename": "NameError",
        "evalue": "name 'y' is not defined",
        "traceback": [
            "Traceback (most recent call last):\n",
            "NameError: name 'y' is not defined\n"
        ]
    }))
    .await;
    deleted(&server, 3).await;

    let notebook = Notebook::connect(config(&server)).await.unwrap();
    let run = notebook
        .run(SourceKind::Python, "x = 1\nprint(y)\nprint(2)\n")
        .await;

    assert_eq!(run.failure, Some(ErrorKind::ExecutionError));
    assert_eq!(run.results.len(), 2);
    assert_eq!(run.results[0].kind, ResultKind::Text);
    assert_eq!(run.results[1].kind, ResultKind::Error);
    assert_eq!(
        run.results[1].data(),
        "name 'y' is not defined\nTraceback (most recent call last):\nNameError: name 'y' is not defined"
    );

    assert_ok!(notebook.close().await);
}

#[tokio::test]
async fn test_legacy_server_runs_sql_through_show() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/version"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    session(&server, 5, "spark", 1).await;

    Mock::given(method("POST"))
        .and(path("/sessions/5/statements"))
        .and(body_string_contains(
            r#"sqlContext.sql(\"\"\"select name, age from people\"\"\").show(1000, false)"#,
        ))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 0, "state": "waiting"})))
        .expect(1)
        .mount(&server)
        .await;
    available(&server, 5, 0, json!({
        "status": "ok",
        "execution_count": 0,
        "data": {"text/plain": "+-----+---+\n| name|age|\n+-----+---+\n|alice| 30|\n+-----+---+\n"}
    }))
    .await;
    deleted(&server, 5).await;

    let notebook = Notebook::connect(config(&server)).await.unwrap();
    assert!(notebook.capabilities().is_legacy());

    let run = notebook
        .run(SourceKind::Sql, "select name, age from people")
        .await;
    assert!(run.is_success());
    assert_eq!(run.results[0].kind, ResultKind::Table);
    assert_eq!(run.results[0].data(), "name\tage\nalice\t30");
    assert!(!run.results[0].truncated);

    let candidates = notebook.complete(SourceKind::Scala, "sc.", 3).await.unwrap();
    assert!(candidates.is_empty());

    assert_ok!(notebook.close().await);
}

#[tokio::test]
async fn test_cancel_running_statement() {
    let server = MockServer::start().await;
    version(&server, "0.7.0").await;
    session(&server, 8, "spark", 1).await;
    submit(&server, 8, 0, json!({"code": "Thread.sleep(60000)"})).await;
    running(&server, 8, 0, 100).await;
    Mock::given(method("GET"))
        .and(path("/sessions/8/statements/0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 0,
            "state": "cancelled"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sessions/8/statements/0/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"msg": "canceled"})))
        .expect(1)
        .mount(&server)
        .await;
    deleted(&server, 8).await;

    let notebook = Notebook::connect(config(&server)).await.unwrap();
    let (run, cancelled) = tokio::join!(
        notebook.run(SourceKind::Scala, "Thread.sleep(60000)"),
        async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            notebook.cancel(SourceKind::Scala).await
        }
    );

    cancelled.unwrap();
    assert_eq!(run.failure, Some(ErrorKind::ExecutionCancelled));
    assert_eq!(run.results.last().map(|r| r.kind), Some(ResultKind::Error));

    assert_ok!(notebook.close().await);
}
