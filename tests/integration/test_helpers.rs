//! Shared helpers for the HTTP-level integration tests.
//!
//! Spawns an `axum` stand-in for the report server on an ephemeral port.
//! Every request is recorded and answered from per-endpoint reply queues
//! so individual test modules can focus on client behaviour.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use bugdesk_client::api::http::HttpReportApi;
use bugdesk_client::ClientConfig;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub const CHAT: i64 = -100_123;
pub const INIT_DATA: &str = "query_id=AAE&user=%7B%22id%22%3A1%7D&hash=f00d";

/// Canned answer for one request.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub delay: Option<Duration>,
}

impl Reply {
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string().into_bytes(),
            delay: None,
        }
    }

    pub fn ok(body: &Value) -> Self {
        Self::json(200, body)
    }

    pub fn raw(status: u16, content_type: &'static str, body: &[u8]) -> Self {
        Self {
            status,
            content_type,
            body: body.to_vec(),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).expect("valid status");
        (status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

/// A file part received by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFile {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub len: usize,
}

/// A multipart submission received by the mock.
#[derive(Debug, Clone, Default)]
pub struct ReceivedSubmission {
    pub fields: HashMap<String, String>,
    pub files: Vec<ReceivedFile>,
}

#[derive(Default)]
pub struct MockState {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<(String, Value)>>,
    submissions: Mutex<Vec<ReceivedSubmission>>,
}

impl MockState {
    /// Next reply for `endpoint`; the last queued reply is sticky.
    fn next_reply(&self, endpoint: &str) -> Reply {
        let mut replies = self.replies.lock().unwrap();
        match replies.get_mut(endpoint) {
            Some(queue) if queue.len() > 1 => queue.pop_front().expect("non-empty"),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Reply::json(404, &json!({"success": false, "error": "no such endpoint"})),
        }
    }
}

/// Running mock report server; shut down on drop.
pub struct MockServer {
    pub base_url: String,
    state: Arc<MockState>,
    shutdown: CancellationToken,
}

impl MockServer {
    /// Queue `reply` for `/api/{endpoint}`.
    pub fn reply(&self, endpoint: &str, reply: Reply) {
        self.state
            .replies
            .lock()
            .unwrap()
            .entry(endpoint.to_owned())
            .or_default()
            .push_back(reply);
    }

    /// JSON bodies received by `endpoint`, in arrival order.
    pub fn requests(&self, endpoint: &str) -> Vec<Value> {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == endpoint)
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// Multipart submissions received so far.
    pub fn submissions(&self) -> Vec<ReceivedSubmission> {
        self.state.submissions.lock().unwrap().clone()
    }

    /// Client configuration pointing at this server.
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::from_toml_str(&format!(
            r#"
base_url = "{base}/"

[network]
request_timeout_seconds = 1

[upload]
timeout_seconds = 5
progress_sample_ms = 0
close_delay_ms = 0
"#,
            base = self.base_url
        ))
        .expect("valid test config");
        config.network.admin_check_retry_delay_ms = 1;
        config
    }

    /// HTTP client for this server.
    pub fn api(&self) -> HttpReportApi {
        HttpReportApi::new(&self.config(), INIT_DATA).expect("client")
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn json_endpoint(
    State(state): State<Arc<MockState>>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    state.requests.lock().unwrap().push((name.clone(), body));
    let reply = state.next_reply(&name);
    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }
    reply.into_response()
}

async fn submit_endpoint(State(state): State<Arc<MockState>>, mut multipart: Multipart) -> Response {
    let mut received = ReceivedSubmission::default();
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let name = field.name().unwrap_or_default().to_owned();
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().unwrap_or_default().to_owned();
        let data = field.bytes().await.expect("field body");
        match file_name {
            Some(file_name) => received.files.push(ReceivedFile {
                field: name,
                file_name,
                content_type,
                len: data.len(),
            }),
            None => {
                let text = String::from_utf8(data.to_vec()).expect("utf8 text field");
                received.fields.insert(name, text);
            }
        }
    }
    state.submissions.lock().unwrap().push(received);
    let reply = state.next_reply("report");
    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }
    reply.into_response()
}

/// Start a mock report server on an ephemeral port.
pub async fn spawn_mock() -> MockServer {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/api/report", post(submit_endpoint))
        .route("/api/{name}", post(json_endpoint))
        .layer(DefaultBodyLimit::disable())
        .with_state(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral");
    let addr = listener.local_addr().expect("local addr");
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await;
    });

    MockServer {
        base_url: format!("http://{addr}"),
        state,
        shutdown,
    }
}

/// A report as the server lists it.
pub fn report_json(id: i64, status: &str) -> Value {
    json!({
        "id": id,
        "report_number": id,
        "status": status,
        "platform": "iOS",
        "platform_version": "17.4",
        "server": "eu-1",
        "user_login": "player",
        "description": format!("bug {id}"),
        "error_time": "2026-03-01T10:00",
        "tracking_id": null,
        "status_comment": null,
        "created_at": "2026-03-01T10:15:00Z",
        "username": "reporter",
        "chat_id": CHAT,
    })
}

/// A successful list response with ids `first..first + count`.
pub fn page_json(first: i64, count: i64, has_more: bool) -> Value {
    let reports: Vec<Value> = (first..first + count).map(|id| report_json(id, "new")).collect();
    json!({"success": true, "reports": reports, "has_more": has_more})
}
