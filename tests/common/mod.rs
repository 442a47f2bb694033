//! Stub HTTP endpoints shared by the integration tests.
//!
//! One Axum server on a random port plays every remote party: the three
//! summary providers, the WeCom webhook, and the Telegram Bot API. Each
//! request body is recorded so tests can assert on what went over the wire.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Maximum time any test is allowed to run before we consider it hung.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One recorded request.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub route: &'static str,
    pub body: Value,
}

/// How the stubs answer. `None` for a provider means it fails.
#[derive(Clone, Default)]
pub struct Script {
    pub workers_ai: Option<String>,
    pub openai: Option<String>,
    pub anthropic: Option<String>,
    pub wecom_errcode: i64,
}

#[derive(Clone)]
struct StubState {
    script: Arc<Script>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubState {
    fn record(&self, route: &'static str, body: Value) {
        self.requests.lock().unwrap().push(Recorded { route, body });
    }
}

pub struct StubServer {
    pub base: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubServer {
    /// Start the stubs with the given script.
    pub async fn start(script: Script) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            script: Arc::new(script),
            requests: Arc::clone(&requests),
        };

        let app = Router::new()
            .route("/accounts/{account}/ai/run/{*model}", post(workers_ai))
            .route("/v1/chat/completions", post(openai))
            .route("/v1/messages", post(anthropic))
            .route("/wecom", post(wecom))
            .route("/{bot}/sendMessage", post(telegram))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting connections.
        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            base: format!("http://127.0.0.1:{port}"),
            requests,
        }
    }

    /// Bodies received on `route`, in arrival order.
    pub fn requests(&self, route: &str) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.route == route)
            .map(|r| r.body.clone())
            .collect()
    }

    /// Environment pointing every provider and channel at this server.
    pub fn env(&self) -> HashMap<String, String> {
        let base = &self.base;
        [
            ("CF_ACCOUNT_ID", "acct-1".to_string()),
            ("CF_API_TOKEN", "cf-token".to_string()),
            ("WORKERS_AI_BASE_URL", base.clone()),
            ("OPENAI_API_KEY", "sk-test".to_string()),
            ("OPENAI_BASE_URL", format!("{base}/v1")),
            ("ANTHROPIC_API_KEY", "sk-ant-test".to_string()),
            ("ANTHROPIC_BASE_URL", base.clone()),
            ("WECOM_WEBHOOK_URL", format!("{base}/wecom")),
            ("TELEGRAM_BOT_TOKEN", "123:ABC".to_string()),
            ("TELEGRAM_CHAT_ID", "42".to_string()),
            ("TELEGRAM_API_BASE", base.clone()),
            ("HTTP_TIMEOUT_SECS", "5".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}

async fn workers_ai(State(s): State<StubState>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    s.record("workers_ai", body);
    match &s.script.workers_ai {
        Some(text) => (
            StatusCode::OK,
            Json(json!({ "success": true, "result": { "response": text }, "errors": [] })),
        ),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "errors": [{ "code": 3040, "message": "Capacity temporarily exceeded" }] })),
        ),
    }
}

async fn openai(State(s): State<StubState>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    s.record("openai", body);
    match &s.script.openai {
        Some(text) => (
            StatusCode::OK,
            Json(json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1_700_000_000,
                "model": body_model(&s, "openai"),
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": text, "refusal": null, "tool_calls": [] },
                    "logprobs": null,
                    "finish_reason": "stop"
                }],
                "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
            })),
        ),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": {
                "message": "Incorrect API key provided: sk-***",
                "type": "invalid_request_error",
                "param": null,
                "code": "invalid_api_key"
            } })),
        ),
    }
}

async fn anthropic(State(s): State<StubState>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    s.record("anthropic", body);
    match &s.script.anthropic {
        Some(text) => (
            StatusCode::OK,
            Json(json!({
                "id": "msg_01",
                "type": "message",
                "role": "assistant",
                "model": body_model(&s, "anthropic"),
                "content": [{ "type": "text", "text": text }],
                "stop_reason": "end_turn",
                "stop_sequence": null,
                "usage": {
                    "input_tokens": 10,
                    "output_tokens": 5,
                    "cache_creation_input_tokens": 0,
                    "cache_read_input_tokens": 0
                }
            })),
        ),
        None => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "type": "error", "error": {
                "type": "rate_limit_error",
                "message": "Number of requests has exceeded your rate limit"
            } })),
        ),
    }
}

/// Model named in the latest request on `route`.
fn body_model(s: &StubState, route: &str) -> Value {
    s.requests
        .lock()
        .unwrap()
        .iter()
        .rev()
        .find(|r| r.route == route)
        .map(|r| r.body["model"].clone())
        .unwrap_or(Value::Null)
}

/// Text of a chat `content` field, whether sent as a string or as blocks.
pub fn text_of(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter_map(|b| b["text"].as_str())
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    }
}

async fn wecom(State(s): State<StubState>, Json(body): Json<Value>) -> Json<Value> {
    s.record("wecom", body);
    let errcode = s.script.wecom_errcode;
    let errmsg = if errcode == 0 { "ok" } else { "invalid webhook url" };
    Json(json!({ "errcode": errcode, "errmsg": errmsg }))
}

async fn telegram(State(s): State<StubState>, Json(body): Json<Value>) -> Json<Value> {
    s.record("telegram", body);
    Json(json!({ "ok": true, "result": { "message_id": 1 } }))
}
