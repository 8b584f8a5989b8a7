//! Engine error taxonomy
//!
//! Everything except `StorageUnavailable` is a caller mistake or a
//! capacity decision the caller can act on.

use keel_core::domain::job::JobStatus;
use keel_core::machine::{Action, TransitionError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    /// Carries only the id the caller already supplied
    #[error("caller may not access job {0}")]
    Forbidden(Uuid),

    #[error("cannot {action} a job that is {state}")]
    InvalidTransition { action: Action, state: JobStatus },

    #[error("no execution slot available for job {0}")]
    CapacityExceeded(Uuid),

    #[error("job {0} already exists")]
    AlreadyExists(Uuid),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("job store unavailable: {0}")]
    StorageUnavailable(String),
}

impl EngineError {
    /// Stable machine-readable name, used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "not_found",
            EngineError::Forbidden(_) => "forbidden",
            EngineError::InvalidTransition { .. } => "invalid_transition",
            EngineError::CapacityExceeded(_) => "capacity_exceeded",
            EngineError::AlreadyExists(_) => "already_exists",
            EngineError::Validation(_) => "validation",
            EngineError::StorageUnavailable(_) => "storage_unavailable",
        }
    }
}

impl From<TransitionError> for EngineError {
    fn from(err: TransitionError) -> Self {
        EngineError::InvalidTransition {
            action: err.action,
            state: err.state,
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::StorageUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
