//! Error types for the EventGateway

use serde::Serialize;
use thiserror::Error;
use warp::http::StatusCode;

/// Errors that can occur in the EventGateway
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Server error: {0}")]
    Server(#[from] warp::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for EventGateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
    pub timestamp: String,
}

/// Error detail
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail { code: code.to_string(), message: message.into(), details: None },
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    /// Render as a JSON reply with the given status
    pub fn into_reply(self, status: StatusCode) -> warp::reply::Response {
        use warp::Reply;
        warp::reply::with_status(warp::reply::json(&self), status).into_response()
    }
}

/// Error codes returned in [`ErrorDetail::code`]
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const BUFFER_FULL: &str = "BUFFER_FULL";
    pub const STORE_READ_ERROR: &str = "STORE_READ_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const METHOD_NOT_ALLOWED: &str = "METHOD_NOT_ALLOWED";
    pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}
