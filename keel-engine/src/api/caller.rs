//! Caller identity
//!
//! Authentication happens in front of the engine; the session's id arrives
//! in the `x-keel-caller` header and every job operation is checked against it.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::api::error::ApiError;

pub const CALLER_HEADER: &str = "x-keel-caller";

#[derive(Debug, Clone)]
pub struct Caller(pub String);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller = parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", CALLER_HEADER)))?;

        Ok(Caller(caller.to_string()))
    }
}
