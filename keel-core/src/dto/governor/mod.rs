//! Concurrency governor DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of work currently holding an execution slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotHolder {
    pub job_id: Uuid,
    pub admitted_at: chrono::DateTime<chrono::Utc>,
    pub deadline: chrono::DateTime<chrono::Utc>,
}

/// Snapshot of slot usage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernorStatus {
    pub slots: usize,
    pub holders: Vec<SlotHolder>,
}
