//! Gateway error taxonomy
//!
//! Every fallible operation in the core returns [`GatewayError`]. The HTTP
//! layer decides how much of each variant a client is allowed to see.

use thiserror::Error;

/// Errors produced by generation and gallery operations
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed or out-of-bounds input; nothing was performed
    #[error("{0}")]
    Validation(String),

    /// Transport failure, non-success status, or error payload from upstream
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Upstream succeeded but no image could be recovered.
    ///
    /// `body` holds the size-capped response for logging only.
    #[error("no image found in upstream response")]
    Extraction { body: String },

    /// Backing document could not be read for an update, or written
    #[error("storage error: {0}")]
    Storage(String),
}

impl GatewayError {
    pub fn validation(msg: impl Into<String>) -> Self {
        GatewayError::Validation(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        GatewayError::Upstream(msg.into())
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(e: std::io::Error) -> Self {
        GatewayError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Storage(e.to_string())
    }
}
