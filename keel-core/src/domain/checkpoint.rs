//! Checkpoint domain types
//!
//! A checkpoint is the last resumable progress an executor reported for a
//! job. The engine stores it and hands it back; it never looks inside `data`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress snapshot embedded in a job record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Activity name at checkpoint time
    pub step: String,

    /// Progress at checkpoint time, restored into the job on resume
    pub progress: f64,

    /// Strictly increasing per job until the checkpoint is cleared
    pub sequence: u64,

    /// Opaque executor payload
    #[serde(with = "crate::blob")]
    pub data: Vec<u8>,

    pub saved_at: DateTime<Utc>,
}

/// Outcome of offering a checkpoint to a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointWrite {
    /// Stored; the job now holds this sequence
    Applied,
    /// Ignored because the stored checkpoint is at `current` or newer
    Stale { current: u64 },
}

impl Checkpoint {
    /// Stores `incoming` into `slot` unless it would rewind the sequence
    pub fn offer(slot: &mut Option<Checkpoint>, incoming: Checkpoint) -> CheckpointWrite {
        match slot {
            Some(current) if incoming.sequence <= current.sequence => CheckpointWrite::Stale {
                current: current.sequence,
            },
            _ => {
                *slot = Some(incoming);
                CheckpointWrite::Applied
            }
        }
    }
}
