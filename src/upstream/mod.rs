//! Upstream image backend integration
//!
//! Provides:
//! - Multimodal message building for OpenAI-compatible chat completions
//! - Defensive image extraction from heterogeneous response shapes
//! - An HTTP client for the backend (bearer auth, bounded wait)

mod extract;
mod messages;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::GatewayError;

pub use extract::{cap_for_log, extract_image, find_embedded_image, UpstreamShape};
pub use messages::{build_messages, ChatMessage, ContentPart, ImageUrl, MessageContent};

/// Chat completion request body
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// A backend that answers chat completion requests with raw JSON
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Send one request; no retries
    async fn complete(&self, request: &ChatRequest) -> Result<Value, GatewayError>;
}

/// OpenAI-compatible HTTP backend
#[derive(Debug)]
pub struct HttpUpstream {
    /// HTTP client
    client: Client,
    /// Full chat completions endpoint
    api_url: String,
    /// Bearer token
    api_key: Option<String>,
    /// Cap for logged error bodies
    diagnostic_limit: usize,
}

impl HttpUpstream {
    /// Create a client from configuration
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()
            .map_err(|e| GatewayError::upstream(format!("failed to build HTTP client: {}", e)))?;

        if config.api_key.is_none() {
            warn!("No upstream API key configured, requests go out without Authorization");
        }

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            diagnostic_limit: config.diagnostic_body_limit,
        })
    }

}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn complete(&self, request: &ChatRequest) -> Result<Value, GatewayError> {
        debug!("Sending chat request to {} (model {})", self.api_url, request.model);

        let mut builder = self.client.post(&self.api_url).json(request);
        if let Some(api_key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::upstream("request timed out")
            } else {
                GatewayError::upstream(format!("request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(
                "Upstream error: {} - {}",
                status,
                cap_for_log(&body, self.diagnostic_limit)
            );
            return Err(GatewayError::upstream(format!("API error: {}", status)));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::upstream("request timed out")
            } else {
                GatewayError::upstream(format!("failed to read response: {}", e))
            }
        })?;
        parse_response(&body, self.diagnostic_limit)
    }
}

/// Parse a success body, logging it capped when it is not JSON
fn parse_response(body: &str, diagnostic_limit: usize) -> Result<Value, GatewayError> {
    serde_json::from_str(body).map_err(|e| {
        warn!(
            "Upstream returned invalid JSON: {} - {}",
            e,
            cap_for_log(body, diagnostic_limit)
        );
        GatewayError::upstream(format!("invalid JSON response: {}", e))
    })
}
