//! Typed errors for LLM operations
//!
//! Structured error types so callers can distinguish common failure modes
//! (auth, rate limiting, timeouts) without string matching.

use thiserror::Error;

/// LLM operation errors with typed variants
#[derive(Debug, Error)]
pub enum LlmError {
    /// Authentication token is expired or invalid (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Malformed request (HTTP 400); caller error, should not retry
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Server-side error (HTTP 5xx)
    #[error("Service error: {0}")]
    ServiceError(String),

    /// Request exceeded the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Network connectivity issue (connection refused, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// Response arrived but did not carry the expected message content
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Other errors not fitting the above categories
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl LlmError {
    /// Convert HTTP status code and error text into typed LlmError
    pub fn from_http_status(status: reqwest::StatusCode, error_text: String) -> Self {
        match status.as_u16() {
            401 => LlmError::Unauthorized(error_text),
            429 => LlmError::RateLimited(error_text),
            400 => LlmError::BadRequest(error_text),
            500..=599 => LlmError::ServiceError(error_text),
            _ => LlmError::Other(anyhow::anyhow!("HTTP {}: {}", status, error_text)),
        }
    }

    /// Convert network/connection errors into typed LlmError
    pub fn from_network_error(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout(e.to_string())
        } else if e.is_connect() {
            LlmError::Network(format!("Connection failed: {}", e))
        } else if let Some(status) = e.status() {
            Self::from_http_status(status, e.to_string())
        } else {
            LlmError::Other(e.into())
        }
    }
}
