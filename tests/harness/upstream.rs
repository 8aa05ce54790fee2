//! MockUpstream - stand-in image backend
//!
//! Answers `POST /v1/chat/completions` in whichever response shape the
//! current `MockReply` selects and records every request it receives.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Response shape the mock produces
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Chat completion with `![Generated Image](data:...)`
    Markdown,
    /// Chat completion with a bare data URL inside prose
    BareDataUrl,
    /// Image API `data[0].b64_json`
    B64Json,
    /// Image API `data[0].url`
    Url(String),
    /// Top-level `error` object with HTTP 200
    ErrorPayload(String),
    /// Chat completion without any image
    NoImage,
    /// Non-success HTTP status
    Status(u16),
    /// HTTP 200 with a body that is not JSON
    NotJson,
    /// Markdown reply after a delay
    Slow(Duration),
}

/// A request seen by the mock
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub authorization: Option<String>,
    pub body: Value,
}

struct MockState {
    reply: Mutex<MockReply>,
    seen: Mutex<Vec<SeenRequest>>,
}

/// The data URL every image-bearing reply embeds
pub fn mock_image() -> String {
    format!(
        "data:image/png;base64,{}",
        BASE64.encode(b"\x89PNG\r\n\x1a\nmock image bytes")
    )
}

/// Running mock backend
pub struct MockUpstream {
    pub addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockUpstream {
    /// Start the mock on a random port
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = Arc::new(MockState {
            reply: Mutex::new(MockReply::Markdown),
            seen: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1/chat/completions", post(completions))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Mock upstream error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// Chat completions endpoint URL
    pub fn url(&self) -> String {
        format!("http://{}/v1/chat/completions", self.addr)
    }

    /// Switch the reply shape for subsequent requests
    pub fn set_reply(&self, reply: MockReply) {
        *self.state.reply.lock().unwrap() = reply;
    }

    /// Number of requests received
    pub fn calls(&self) -> usize {
        self.state.seen.lock().unwrap().len()
    }

    /// Most recent request
    pub fn last_request(&self) -> Option<SeenRequest> {
        self.state.seen.lock().unwrap().last().cloned()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn chat_completion(content: String) -> Value {
    json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "created": chrono::Utc::now().timestamp(),
        "model": "banana-pro",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 50, "completion_tokens": 10, "total_tokens": 60}
    })
}

async fn completions(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.seen.lock().unwrap().push(SeenRequest {
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });

    let reply = state.reply.lock().unwrap().clone();
    let image = mock_image();

    match reply {
        MockReply::Markdown => {
            Json(chat_completion(format!("![Generated Image]({})", image))).into_response()
        }
        MockReply::BareDataUrl => {
            Json(chat_completion(format!("Here it is: {} enjoy", image))).into_response()
        }
        MockReply::B64Json => {
            let payload = image.split_once(',').map(|(_, p)| p).unwrap_or_default();
            Json(json!({"created": 1, "data": [{"b64_json": payload}]})).into_response()
        }
        MockReply::Url(url) => Json(json!({"created": 1, "data": [{"url": url}]})).into_response(),
        MockReply::ErrorPayload(message) => {
            Json(json!({"error": {"message": message, "type": "server_error"}})).into_response()
        }
        MockReply::NoImage => {
            Json(chat_completion("I cannot draw that.".to_string())).into_response()
        }
        MockReply::Status(code) => (
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            "upstream exploded",
        )
            .into_response(),
        MockReply::NotJson => (
            StatusCode::OK,
            "<html>upstream proxy page</html>",
        )
            .into_response(),
        MockReply::Slow(delay) => {
            tokio::time::sleep(delay).await;
            Json(chat_completion(format!("![Generated Image]({})", image))).into_response()
        }
    }
}
