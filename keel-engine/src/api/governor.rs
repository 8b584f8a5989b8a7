//! Governor API Handler

use std::sync::Arc;

use axum::{Json, extract::State};
use keel_core::dto::governor::GovernorStatus;

use crate::service::Coordinator;

/// GET /governor
/// Current slot holders with their admission time and deadline
pub async fn governor_status(State(coordinator): State<Arc<Coordinator>>) -> Json<GovernorStatus> {
    Json(coordinator.governor().status())
}
