//! Job DTOs for the engine API

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::JobRecord;

/// Request to create a new job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    pub kind: String,
    /// Initial step description; defaults to "Queued"
    #[serde(default)]
    pub step: Option<String>,
}

/// Response to `start`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub job: JobRecord,
    /// Job whose slot was taken to admit this one
    pub preempted: Option<Uuid>,
    /// The slot was already revoked; an HTTP executor should not begin
    pub cancel_requested: bool,
}

/// Response to `resume`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeResponse {
    pub job: JobRecord,
    pub checkpoint_available: bool,
    pub checkpoint_sequence: Option<u64>,
    pub preempted: Option<Uuid>,
}

/// Checkpoint write from an executor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointUpdate {
    pub step: String,
    pub progress: f64,
    /// Must not exceed `i64::MAX`; larger values are rejected as invalid
    pub sequence: u64,
    #[serde(with = "crate::blob")]
    pub data: Vec<u8>,
}

/// Engine answer to a checkpoint write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointAck {
    /// False when the write carried a stale sequence and was ignored
    pub accepted: bool,
    /// Sequence the job holds after the write
    pub sequence: u64,
    /// The job is no longer running; the executor should stop
    pub cancel_requested: bool,
}

/// Live progress report from an executor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub step: String,
    pub progress: f64,
}

/// Executor reports successful completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteJob {
    #[serde(default)]
    pub result: serde_json::Value,
}

/// Executor reports failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailJob {
    pub error: String,
}
