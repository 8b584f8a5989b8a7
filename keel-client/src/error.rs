//! Error types for the Keel client

use serde::Deserialize;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the Keel client
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Engine answered with an error status
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Machine-readable error kind, e.g. `invalid_transition`
        code: Option<String>,
        /// Error message from the engine
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    code: Option<String>,
}

impl ClientError {
    /// Builds an API error from a status code and the raw response body
    ///
    /// Engine error bodies are JSON; anything else is kept verbatim.
    pub fn api_error(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => Self::ApiError {
                status,
                code: parsed.code,
                message: parsed.error,
            },
            Err(_) => Self::ApiError {
                status,
                code: None,
                message: body,
            },
        }
    }

    /// Error kind reported by the engine, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::ApiError { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The job belongs to another caller
    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }

    /// The action is not legal in the job's current state
    pub fn is_invalid_transition(&self) -> bool {
        self.code() == Some("invalid_transition")
    }

    /// No execution slot was available
    pub fn is_capacity_exceeded(&self) -> bool {
        self.code() == Some("capacity_exceeded")
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(status) if (400..500).contains(&status))
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(status) if status >= 500)
    }
}
