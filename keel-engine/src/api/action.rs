//! Action Log API Handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use keel_core::domain::action::ActionLogEntry;
use keel_core::dto::action::ActionBatch;
use uuid::Uuid;

use crate::api::caller::Caller;
use crate::api::error::ApiResult;
use crate::service::Coordinator;

/// GET /jobs/{id}/actions
/// Entries in insertion order; empty when none were recorded
pub async fn list_actions(
    State(coordinator): State<Arc<Coordinator>>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ActionLogEntry>>> {
    Ok(Json(coordinator.action_log(&caller, id).await?))
}

/// POST /jobs/{id}/actions
/// Accepts a single entry or an array of entries
pub async fn append_actions(
    State(coordinator): State<Arc<Coordinator>>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
    Json(batch): Json<ActionBatch>,
) -> ApiResult<(StatusCode, Json<Vec<ActionLogEntry>>)> {
    let entries = coordinator
        .append_actions(&caller, id, batch.into_entries())
        .await?;
    Ok((StatusCode::CREATED, Json(entries)))
}
