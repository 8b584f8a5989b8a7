//! Executor channel
//!
//! What a unit of work reports back while it runs: checkpoints, live
//! progress, and its final outcome. The engine never calls the executor;
//! a remote executor learns about cancellation from the `cancel_requested`
//! flag on its next checkpoint write.

use std::sync::{Arc, OnceLock};

use keel_core::domain::checkpoint::{Checkpoint, CheckpointWrite};
use keel_core::domain::job::{JobRecord, JobStatus};
use keel_core::dto::job::{CheckpointAck, CheckpointUpdate, CompleteJob, FailJob, ProgressUpdate};
use keel_core::machine::{self, Action, Event};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::coordinator::{Coordinator, SlotEffect, logged};
use crate::error::{EngineError, Result};

/// What happened to a checkpoint write inside the store update
#[derive(Debug, Clone, Copy)]
enum Outcome {
    Written(CheckpointWrite),
    /// The job no longer takes checkpoints
    Refused,
}

impl Coordinator {
    /// Stores a checkpoint unless it is older than the one already held
    ///
    /// Writes to a job that is neither running nor paused are not applied
    /// and answer `cancel_requested`.
    pub async fn write_checkpoint(
        &self,
        caller_id: &str,
        job_id: Uuid,
        update: CheckpointUpdate,
    ) -> Result<CheckpointAck> {
        validate_step_progress(&update.step, update.progress)?;
        validate_sequence(update.sequence)?;

        let now = self.clock.now();
        let checkpoint = Checkpoint {
            step: update.step,
            progress: update.progress,
            sequence: update.sequence,
            data: update.data,
            saved_at: now,
        };

        let outcome = Arc::new(OnceLock::new());
        let slot = Arc::clone(&outcome);
        let job = self
            .store
            .update_owned(
                job_id,
                caller_id,
                Box::new(move |current| {
                    if !Action::WriteCheckpoint.allowed_from(current.status()) {
                        let _ = slot.set(Outcome::Refused);
                        return Ok(current.clone());
                    }
                    let (next, write) = machine::write_checkpoint(current, checkpoint, now)?;
                    let _ = slot.set(Outcome::Written(write));
                    Ok(next)
                }),
            )
            .await;
        let job = logged("write_checkpoint", job_id, job)?;

        let sequence = job.checkpoint_sequence().unwrap_or(0);
        let cancel_requested = job.status() != JobStatus::Running;
        let accepted = match outcome.get() {
            Some(Outcome::Written(CheckpointWrite::Applied)) => {
                debug!(job_id = %job_id, sequence = sequence, "Checkpoint written");
                true
            }
            Some(Outcome::Written(CheckpointWrite::Stale { current })) => {
                warn!(
                    job_id = %job_id,
                    offered = update.sequence,
                    current = current,
                    "Ignoring stale checkpoint"
                );
                false
            }
            Some(Outcome::Refused) | None => {
                debug!(job_id = %job_id, state = %job.status(), "Checkpoint refused");
                false
            }
        };

        Ok(CheckpointAck {
            accepted,
            sequence,
            cancel_requested,
        })
    }

    /// Updates the live step and progress of a running job
    pub async fn report_progress(
        &self,
        caller_id: &str,
        job_id: Uuid,
        update: ProgressUpdate,
    ) -> Result<JobRecord> {
        validate_step_progress(&update.step, update.progress)?;

        let now = self.clock.now();
        let job = self
            .store
            .update_owned(
                job_id,
                caller_id,
                Box::new(move |current| {
                    Ok(machine::report_progress(
                        current,
                        update.step,
                        update.progress,
                        now,
                    )?)
                }),
            )
            .await;
        let job = logged("report_progress", job_id, job)?;

        debug!(job_id = %job_id, step = %job.step, progress = job.progress, "Progress reported");
        Ok(job)
    }

    pub async fn complete(
        &self,
        caller_id: &str,
        job_id: Uuid,
        req: CompleteJob,
    ) -> Result<JobRecord> {
        let event = Event::Complete { result: req.result };
        let job = self
            .transition(caller_id, job_id, event, SlotEffect::Release)
            .await?;
        info!(job_id = %job_id, "Job completed");
        Ok(job)
    }

    pub async fn fail(&self, caller_id: &str, job_id: Uuid, req: FailJob) -> Result<JobRecord> {
        let event = Event::Fail {
            error: req.error.clone(),
        };
        let job = self
            .transition(caller_id, job_id, event, SlotEffect::Release)
            .await?;
        info!(job_id = %job_id, error = %req.error, "Job failed");
        Ok(job)
    }
}

fn validate_step_progress(step: &str, progress: f64) -> Result<()> {
    if step.trim().is_empty() {
        return Err(EngineError::Validation("step cannot be empty".to_string()));
    }
    if !(0.0..=100.0).contains(&progress) {
        return Err(EngineError::Validation(format!(
            "progress must be between 0 and 100, got {}",
            progress
        )));
    }
    Ok(())
}

/// Sequences are stored as signed 64-bit integers
fn validate_sequence(sequence: u64) -> Result<()> {
    if sequence > i64::MAX as u64 {
        return Err(EngineError::Validation(format!(
            "sequence must be at most {}, got {}",
            i64::MAX,
            sequence
        )));
    }
    Ok(())
}
