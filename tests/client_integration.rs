use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use rqlite_http::{
    BatchStatement, ConnectOptions, Connection, Params, RqliteError, TransportError, Value,
};
use serde_json::{json, Value as JsonValue};

#[derive(Clone)]
struct MockResponse {
    status: StatusCode,
    body: JsonValue,
    delay: Duration,
}

impl MockResponse {
    fn json(status: StatusCode, body: JsonValue) -> Self {
        Self {
            status,
            body,
            delay: Duration::from_millis(0),
        }
    }

    fn ok(body: JsonValue) -> Self {
        Self::json(StatusCode::OK, body)
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone, Debug)]
struct RecordedRequest {
    uri: String,
    body: JsonValue,
    authorization: Option<String>,
}

#[derive(Clone)]
struct MockState {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    hits: Arc<AtomicUsize>,
}

async fn rqlite_handler(
    State(state): State<MockState>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state
        .requests
        .lock()
        .expect("request log mutex must not be poisoned")
        .push(RecordedRequest {
            uri: uri.to_string(),
            body: serde_json::from_str(&body).unwrap_or(JsonValue::String(body)),
            authorization: headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned),
        });

    let response = {
        let mut queue = state
            .responses
            .lock()
            .expect("response queue mutex must not be poisoned");
        queue.pop_front().unwrap_or_else(|| {
            MockResponse::json(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "no mock response available"}),
            )
        })
    };

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    (response.status, Json(response.body))
}

struct TestServer {
    port: u16,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    hits: Arc<AtomicUsize>,
    _runtime: tokio::runtime::Runtime,
}

impl TestServer {
    fn dsn(&self) -> String {
        format!("rqlite:host=127.0.0.1;port={}", self.port)
    }

    fn connect(&self) -> Connection {
        Connection::open(&self.dsn()).expect("must connect to mock server")
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn request(&self, index: usize) -> RecordedRequest {
        self.requests
            .lock()
            .expect("request log mutex must not be poisoned")
            .get(index)
            .cloned()
            .expect("request must have been recorded")
    }
}

/// Serves the mock on its own runtime so the blocking client can be driven
/// from plain `#[test]` functions.
fn spawn_server(responses: Vec<MockResponse>) -> TestServer {
    let state = MockState {
        responses: Arc::new(Mutex::new(responses.into())),
        requests: Arc::new(Mutex::new(Vec::new())),
        hits: Arc::new(AtomicUsize::new(0)),
    };

    let app = Router::new()
        .route("/db/query", post(rqlite_handler))
        .route("/db/execute", post(rqlite_handler))
        .with_state(state.clone());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("must build mock server runtime");
    let listener = runtime
        .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
        .expect("must bind test listener");
    let port = listener.local_addr().expect("must have local addr").port();
    runtime.spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });

    TestServer {
        port,
        requests: state.requests,
        hits: state.hits,
        _runtime: runtime,
    }
}

fn users_body() -> JsonValue {
    json!({
        "results": [
            {
                "columns": ["id", "name"],
                "types": ["integer", "text"],
                "values": [[1, "Kit"], [2, "Ada"]],
                "time": 0.0001
            }
        ],
        "time": 0.0002
    })
}

#[test]
fn query_returns_rows_in_column_order() {
    let server = spawn_server(vec![MockResponse::ok(users_body())]);
    let conn = server.connect();

    let mut result = conn
        .query("SELECT id, name FROM users")
        .expect("query must succeed");

    assert_eq!(result.columns(), ["id", "name"]);
    assert_eq!(result.remaining(), 2);
    let rows: Vec<Vec<Value>> = result.rows().map(|row| row.into_values()).collect();
    assert_eq!(
        rows,
        vec![
            vec![Value::Integer(1), Value::text("Kit")],
            vec![Value::Integer(2), Value::text("Ada")],
        ]
    );
    assert!(result.next().is_none());

    let request = server.request(0);
    assert_eq!(request.uri, "/db/query?level=strong");
    assert_eq!(request.body, json!(["SELECT id, name FROM users"]));
    assert_eq!(request.authorization, None);
    assert_eq!(server.hits(), 1);
}

#[test]
fn exec_returns_rows_affected() {
    let server = spawn_server(vec![MockResponse::ok(json!({
        "results": [{ "rows_affected": 1 }]
    }))]);
    let conn = server.connect();

    let affected = conn
        .exec("UPDATE t SET x=1 WHERE id=5")
        .expect("exec must succeed");

    assert_eq!(affected, 1);
    assert_eq!(server.request(0).uri, "/db/execute?level=strong");
    assert_eq!(server.hits(), 1);
}

#[test]
fn prepared_statement_rebinds_and_reexecutes() {
    let server = spawn_server(vec![
        MockResponse::ok(json!({ "results": [{ "last_insert_id": 1, "rows_affected": 1 }] })),
        MockResponse::ok(json!({ "results": [{ "last_insert_id": 2, "rows_affected": 1 }] })),
    ]);
    let conn = server.connect();

    let mut stmt = conn.prepare("INSERT INTO users (name) VALUES (?)");
    stmt.bind([Value::text("Kit")]);
    stmt.execute().expect("first insert must succeed");
    assert_eq!(stmt.last_insert_id(), Some(1));

    stmt.bind([Value::text("Ada")]);
    stmt.execute().expect("second insert must succeed");
    assert_eq!(stmt.row_count(), 1);
    assert_eq!(stmt.last_insert_id(), Some(2));
    assert_eq!(conn.last_insert_id(None), 2);

    assert_eq!(server.hits(), 2);
    assert_eq!(
        server.request(0).body,
        json!([["INSERT INTO users (name) VALUES (?)", "Kit"]])
    );
    assert_eq!(
        server.request(1).body,
        json!([["INSERT INTO users (name) VALUES (?)", "Ada"]])
    );
}

#[test]
fn named_parameters_are_sent_as_object() {
    let server = spawn_server(vec![MockResponse::ok(users_body())]);
    let conn = server.connect();

    let mut stmt = conn.prepare("SELECT id, name FROM users WHERE name = :name");
    stmt.bind(Params::named([(":name", Value::text("Kit"))]));
    stmt.execute().expect("query must succeed");

    assert_eq!(
        server.request(0).body,
        json!([["SELECT id, name FROM users WHERE name = :name", { "name": "Kit" }]])
    );
}

#[test]
fn consistency_level_follows_connection_setting() {
    let server = spawn_server(vec![
        MockResponse::ok(users_body()),
        MockResponse::ok(users_body()),
    ]);
    let mut conn = server.connect();

    conn.set_consistency("none");
    conn.query("SELECT id, name FROM users")
        .expect("query must succeed");
    conn.set_consistency("linearizable");
    conn.query("SELECT id, name FROM users")
        .expect("query must succeed");

    assert_eq!(server.request(0).uri, "/db/query?level=none");
    assert_eq!(server.request(1).uri, "/db/query?level=linearizable");
}

#[test]
fn transaction_raw_posts_whole_batch_atomically() {
    let server = spawn_server(vec![MockResponse::ok(json!({
        "results": [
            { "last_insert_id": 1, "rows_affected": 1 },
            { "last_insert_id": 2, "rows_affected": 1 }
        ]
    }))]);
    let conn = server.connect();

    let envelope = conn
        .transaction_raw([
            BatchStatement::from("INSERT INTO users (name) VALUES ('Kit')"),
            BatchStatement::new("INSERT INTO users (name) VALUES (?)", [Value::text("Ada")]),
        ])
        .expect("transaction must succeed");

    assert_eq!(envelope.results.len(), 2);
    assert_eq!(envelope.results[1].last_insert_id, Some(2));
    assert_eq!(conn.last_insert_id(None), 2);

    let request = server.request(0);
    assert_eq!(request.uri, "/db/execute?transaction");
    assert_eq!(
        request.body,
        json!([
            "INSERT INTO users (name) VALUES ('Kit')",
            ["INSERT INTO users (name) VALUES (?)", "Ada"]
        ])
    );
    assert_eq!(server.hits(), 1);
}

#[test]
fn transaction_raw_fails_with_failing_statement_message() {
    let server = spawn_server(vec![MockResponse::ok(json!({
        "results": [
            { "last_insert_id": 1, "rows_affected": 1 },
            { "error": "near \"INSER\": syntax error" }
        ]
    }))]);
    let conn = server.connect();

    let err = conn
        .transaction_raw([
            "INSERT INTO users (name) VALUES ('Kit')",
            "INSER INTO users (name) VALUES ('Ada')",
        ])
        .expect_err("transaction must fail");

    match err {
        RqliteError::Execution {
            statement_index,
            message,
        } => {
            assert_eq!(statement_index, Some(1));
            assert_eq!(message, "near \"INSER\": syntax error");
        }
        other => panic!("expected execution error, got {other:?}"),
    }
}

#[test]
fn execute_batch_omits_transaction_flag() {
    let server = spawn_server(vec![MockResponse::ok(json!({
        "results": [ { "rows_affected": 1 }, { "rows_affected": 0 } ]
    }))]);
    let conn = server.connect();

    conn.execute_batch(["DELETE FROM a", "DELETE FROM b"])
        .expect("batch must succeed");

    assert_eq!(server.request(0).uri, "/db/execute");
}

#[test]
fn statement_error_is_execution_error_with_remote_message() {
    let server = spawn_server(vec![MockResponse::ok(json!({
        "results": [{ "error": "no such table: users" }]
    }))]);
    let conn = server.connect();

    let err = conn
        .query("SELECT * FROM users")
        .expect_err("query must fail");

    assert_eq!(err.to_string(), "no such table: users");
    assert!(matches!(
        err,
        RqliteError::Execution {
            statement_index: Some(0),
            ..
        }
    ));
}

#[test]
fn non_success_status_is_transport_error() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::SERVICE_UNAVAILABLE,
        json!({ "results": [{ "error": "leader not found" }] }),
    )]);
    let conn = server.connect();

    let err = conn.exec("DELETE FROM users").expect_err("exec must fail");

    match err {
        RqliteError::Transport(TransportError::Status { status, .. }) => assert_eq!(status, 503),
        other => panic!("expected transport status error, got {other:?}"),
    }
    assert_eq!(server.hits(), 1);
}

#[test]
fn malformed_envelope_is_protocol_error() {
    let server = spawn_server(vec![MockResponse::ok(json!("not an envelope"))]);
    let conn = server.connect();

    let err = conn.query("SELECT 1").expect_err("query must fail");

    assert!(matches!(err, RqliteError::Protocol(_)));
}

#[test]
fn request_timeout_surfaces_transport_error_without_retry() {
    let server = spawn_server(vec![MockResponse::ok(json!({
        "results": [{ "rows_affected": 1 }]
    }))
    .with_delay(Duration::from_millis(300))]);

    let conn = Connection::open_with_options(
        &server.dsn(),
        ConnectOptions {
            timeout_ms: 20,
            tls: false,
        },
    )
    .expect("must connect");

    let err = conn.exec("DELETE FROM users").expect_err("exec must time out");

    assert!(matches!(
        err,
        RqliteError::Transport(TransportError::Request(_))
    ));
    assert!(server.hits() <= 1);
}

#[test]
fn last_insert_id_reads_sqlite_sequence() {
    let server = spawn_server(vec![MockResponse::ok(json!({
        "results": [{ "columns": ["seq"], "types": ["integer"], "values": [[42]] }]
    }))]);
    let conn = server.connect();

    assert_eq!(conn.last_insert_id(Some("users")), 42);

    let request = server.request(0);
    assert_eq!(request.uri, "/db/query?level=strong");
    assert_eq!(
        request.body,
        json!(["SELECT seq FROM sqlite_sequence WHERE name = 'users'"])
    );
}

#[test]
fn last_insert_id_returns_zero_on_any_lookup_failure() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "boom" })),
        MockResponse::ok(json!({ "results": [{ "error": "no such table: sqlite_sequence" }] })),
        MockResponse::ok(json!("garbage")),
        MockResponse::ok(json!({ "results": [{ "columns": ["seq"], "types": ["integer"] }] })),
    ]);
    let conn = server.connect();

    for _ in 0..4 {
        assert_eq!(conn.last_insert_id(Some("users")), 0);
    }
    assert_eq!(server.hits(), 4);
}

#[test]
fn last_insert_id_returns_zero_when_server_is_unreachable() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("must bind");
        listener.local_addr().expect("must have local addr").port()
    };
    let conn = Connection::open(&format!("rqlite:host=127.0.0.1;port={port}"))
        .expect("must build connection");

    assert_eq!(conn.last_insert_id(Some("users")), 0);
}

#[test]
fn dsn_credentials_are_sent_as_basic_auth() {
    let server = spawn_server(vec![MockResponse::ok(users_body())]);
    let conn = Connection::open(&format!("{};username=bob;password=secret", server.dsn()))
        .expect("must connect");

    conn.query("SELECT id, name FROM users")
        .expect("query must succeed");

    assert_eq!(
        server.request(0).authorization.as_deref(),
        Some("Basic Ym9iOnNlY3JldA==")
    );
}
