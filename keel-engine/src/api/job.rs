//! Job API Handlers
//!
//! HTTP endpoints for the job lifecycle and for executor reports.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use keel_core::domain::job::JobRecord;
use keel_core::dto::job::{
    CheckpointAck, CheckpointUpdate, CompleteJob, CreateJob, FailJob, ProgressUpdate,
    ResumeResponse, StartResponse,
};
use uuid::Uuid;

use crate::api::caller::Caller;
use crate::api::error::ApiResult;
use crate::service::Coordinator;

// =============================================================================
// Owner Endpoints
// =============================================================================

/// POST /jobs
pub async fn create_job(
    State(coordinator): State<Arc<Coordinator>>,
    Caller(caller): Caller,
    Json(req): Json<CreateJob>,
) -> ApiResult<(StatusCode, Json<JobRecord>)> {
    let job = coordinator.create(&caller, req).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /jobs
/// The caller's jobs, newest first
pub async fn list_jobs(
    State(coordinator): State<Arc<Coordinator>>,
    Caller(caller): Caller,
) -> ApiResult<Json<Vec<JobRecord>>> {
    Ok(Json(coordinator.list(&caller).await?))
}

/// GET /jobs/{id}
pub async fn get_job(
    State(coordinator): State<Arc<Coordinator>>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobRecord>> {
    Ok(Json(coordinator.snapshot(&caller, id).await?))
}

/// POST /jobs/{id}/start
pub async fn start_job(
    State(coordinator): State<Arc<Coordinator>>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StartResponse>> {
    let admitted = coordinator.start(&caller, id).await?;

    Ok(Json(StartResponse {
        cancel_requested: admitted.grant.token.is_cancelled(),
        preempted: admitted.grant.preempted,
        job: admitted.job,
    }))
}

/// POST /jobs/{id}/pause
pub async fn pause_job(
    State(coordinator): State<Arc<Coordinator>>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobRecord>> {
    Ok(Json(coordinator.pause(&caller, id).await?))
}

/// POST /jobs/{id}/resume
pub async fn resume_job(
    State(coordinator): State<Arc<Coordinator>>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ResumeResponse>> {
    let admitted = coordinator.resume(&caller, id).await?;
    let checkpoint_sequence = admitted.job.checkpoint_sequence();

    Ok(Json(ResumeResponse {
        checkpoint_available: checkpoint_sequence.is_some(),
        checkpoint_sequence,
        preempted: admitted.grant.preempted,
        job: admitted.job,
    }))
}

/// POST /jobs/{id}/restart
pub async fn restart_job(
    State(coordinator): State<Arc<Coordinator>>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobRecord>> {
    Ok(Json(coordinator.restart(&caller, id).await?))
}

/// POST /jobs/{id}/cancel
pub async fn cancel_job(
    State(coordinator): State<Arc<Coordinator>>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobRecord>> {
    Ok(Json(coordinator.cancel(&caller, id).await?))
}

/// DELETE /jobs/{id}/checkpoint
pub async fn clear_checkpoint(
    State(coordinator): State<Arc<Coordinator>>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobRecord>> {
    Ok(Json(coordinator.clear_checkpoint(&caller, id).await?))
}

// =============================================================================
// Executor Endpoints
// =============================================================================

/// PUT /jobs/{id}/checkpoint
pub async fn write_checkpoint(
    State(coordinator): State<Arc<Coordinator>>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
    Json(update): Json<CheckpointUpdate>,
) -> ApiResult<Json<CheckpointAck>> {
    Ok(Json(coordinator.write_checkpoint(&caller, id, update).await?))
}

/// POST /jobs/{id}/progress
pub async fn report_progress(
    State(coordinator): State<Arc<Coordinator>>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
    Json(update): Json<ProgressUpdate>,
) -> ApiResult<Json<JobRecord>> {
    Ok(Json(coordinator.report_progress(&caller, id, update).await?))
}

/// POST /jobs/{id}/complete
pub async fn complete_job(
    State(coordinator): State<Arc<Coordinator>>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
    Json(req): Json<CompleteJob>,
) -> ApiResult<Json<JobRecord>> {
    Ok(Json(coordinator.complete(&caller, id, req).await?))
}

/// POST /jobs/{id}/fail
pub async fn fail_job(
    State(coordinator): State<Arc<Coordinator>>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
    Json(req): Json<FailJob>,
) -> ApiResult<Json<JobRecord>> {
    Ok(Json(coordinator.fail(&caller, id, req).await?))
}
