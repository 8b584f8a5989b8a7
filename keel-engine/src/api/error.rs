//! API Error Handling
//!
//! Maps engine errors onto HTTP statuses with a JSON body of the form
//! `{"error": <message>, "code": <kind>}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::EngineError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    Engine(EngineError),
    /// Request carried no caller identity
    Unauthorized(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Engine(err) => match err {
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
                EngineError::InvalidTransition { .. } | EngineError::Validation(_) => {
                    StatusCode::BAD_REQUEST
                }
                EngineError::CapacityExceeded(_) | EngineError::AlreadyExists(_) => {
                    StatusCode::CONFLICT
                }
                EngineError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Engine(err) => err.code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = match self {
            ApiError::Unauthorized(msg) => msg,
            ApiError::Engine(err) => {
                if status.is_server_error() {
                    tracing::error!("Engine error: {}", err);
                }
                err.to_string()
            }
        };

        (
            status,
            Json(serde_json::json!({ "error": message, "code": code })),
        )
            .into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
