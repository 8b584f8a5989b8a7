//! API Module
//!
//! HTTP API layer of the engine.
//! Each submodule handles endpoints for a specific domain.

pub mod action;
pub mod caller;
pub mod error;
pub mod governor;
pub mod health;
pub mod job;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::service::Coordinator;

/// Create the main API router with all endpoints
pub fn create_router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Owner endpoints
        .route("/jobs", post(job::create_job).get(job::list_jobs))
        .route("/jobs/{id}", get(job::get_job))
        .route("/jobs/{id}/start", post(job::start_job))
        .route("/jobs/{id}/pause", post(job::pause_job))
        .route("/jobs/{id}/resume", post(job::resume_job))
        .route("/jobs/{id}/restart", post(job::restart_job))
        .route("/jobs/{id}/cancel", post(job::cancel_job))
        // Executor endpoints
        .route(
            "/jobs/{id}/checkpoint",
            axum::routing::put(job::write_checkpoint).delete(job::clear_checkpoint),
        )
        .route("/jobs/{id}/progress", post(job::report_progress))
        .route("/jobs/{id}/complete", post(job::complete_job))
        .route("/jobs/{id}/fail", post(job::fail_job))
        // Action log
        .route(
            "/jobs/{id}/actions",
            get(action::list_actions).post(action::append_actions),
        )
        // Governor introspection
        .route("/governor", get(governor::governor_status))
        // Add state and middleware
        .with_state(coordinator)
        .layer(TraceLayer::new_for_http())
}
