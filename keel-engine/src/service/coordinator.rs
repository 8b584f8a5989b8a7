//! Recovery Coordinator
//!
//! The operations a job owner can invoke: create, start, pause, resume,
//! restart, cancel, clear a checkpoint, and read the record or its action
//! log. Every operation checks ownership, goes through the state machine,
//! and never waits on job execution.

use std::sync::{Arc, OnceLock};

use keel_core::domain::action::ActionLogEntry;
use keel_core::domain::job::{CancelCause, JobRecord, JobState};
use keel_core::dto::action::AppendAction;
use keel_core::dto::job::CreateJob;
use keel_core::machine::{self, Event};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{EngineError, Result};
use crate::governor::{Governor, SlotGrant};
use crate::repository::{ActionLog, JobStore, Mutator, Settle};

const MAX_MESSAGE_LENGTH: usize = 10_000;
const MAX_BATCH_SIZE: usize = 1000;

/// What a transition does to the job's execution slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotEffect {
    Keep,
    /// Free the slot and signal the work to stop
    Release,
}

/// A job that now holds an execution slot
#[derive(Debug, Clone)]
pub struct Admitted {
    pub job: JobRecord,
    /// Hand `grant.token` to the unit of work so it can observe cancellation
    pub grant: SlotGrant,
}

pub struct Coordinator {
    pub(crate) store: Arc<dyn JobStore>,
    actions: Arc<dyn ActionLog>,
    pub(crate) governor: Arc<Governor>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn JobStore>,
        actions: Arc<dyn ActionLog>,
        governor: Arc<Governor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            actions,
            governor,
            clock,
        }
    }

    pub fn governor(&self) -> &Governor {
        &self.governor
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Full record including the checkpoint; never touches the executor
    pub async fn snapshot(&self, caller_id: &str, job_id: Uuid) -> Result<JobRecord> {
        let job = logged("snapshot", job_id, self.store.get_owned(job_id, caller_id).await)?;
        debug!(job_id = %job_id, state = %job.status(), "Snapshot read");
        Ok(job)
    }

    /// The caller's jobs, newest first
    pub async fn list(&self, caller_id: &str) -> Result<Vec<JobRecord>> {
        let mut jobs = self.store.list(Some(caller_id)).await.inspect_err(|e| {
            error!(caller_id = %caller_id, error = %e, "Failed to list jobs");
        })?;
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!(caller_id = %caller_id, count = jobs.len(), "Listed jobs");
        Ok(jobs)
    }

    pub async fn action_log(&self, caller_id: &str, job_id: Uuid) -> Result<Vec<ActionLogEntry>> {
        self.store.get_owned(job_id, caller_id).await?;
        logged("action_log", job_id, self.actions.list(job_id).await)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub async fn create(&self, caller_id: &str, req: CreateJob) -> Result<JobRecord> {
        if req.kind.trim().is_empty() {
            return Err(EngineError::Validation("kind cannot be empty".to_string()));
        }

        let mut job = JobRecord::new(caller_id, req.kind, self.clock.now());
        if let Some(step) = req.step {
            if step.trim().is_empty() {
                return Err(EngineError::Validation("step cannot be empty".to_string()));
            }
            job.step = step;
        }

        let job = logged("create", job.id(), self.store.create(job).await)?;
        info!(job_id = %job.id(), kind = %job.kind, owner_id = %caller_id, "Job created");
        Ok(job)
    }

    /// Moves a created job to running and admits it to the governor
    pub async fn start(&self, caller_id: &str, job_id: Uuid) -> Result<Admitted> {
        let admitted = self.transition_admitted(caller_id, job_id, Event::Start).await?;
        info!(job_id = %job_id, "Job started");
        Ok(admitted)
    }

    /// Stops a running job and frees its slot; the checkpoint is kept
    pub async fn pause(&self, caller_id: &str, job_id: Uuid) -> Result<JobRecord> {
        let job = self
            .transition(caller_id, job_id, Event::Pause, SlotEffect::Release)
            .await?;
        info!(job_id = %job_id, step = %job.step, progress = job.progress, "Job paused");
        Ok(job)
    }

    /// Moves a paused job back to running from its last checkpoint
    ///
    /// Fails with `CapacityExceeded` and leaves the job paused when the
    /// governor cannot admit it.
    pub async fn resume(&self, caller_id: &str, job_id: Uuid) -> Result<Admitted> {
        let admitted = self
            .transition_admitted(caller_id, job_id, Event::Resume)
            .await?;
        info!(
            job_id = %job_id,
            checkpoint_sequence = ?admitted.job.checkpoint_sequence(),
            "Job resumed"
        );
        Ok(admitted)
    }

    /// Resets a finished job to created; the checkpoint stays
    pub async fn restart(&self, caller_id: &str, job_id: Uuid) -> Result<JobRecord> {
        let job = self
            .transition(caller_id, job_id, Event::Restart, SlotEffect::Keep)
            .await?;
        info!(job_id = %job_id, "Job restarted");
        Ok(job)
    }

    /// Cancels on behalf of the owner; cancelling a cancelled job is a no-op
    pub async fn cancel(&self, caller_id: &str, job_id: Uuid) -> Result<JobRecord> {
        let now = self.clock.now();
        let governor = Arc::clone(&self.governor);
        let job = self
            .store
            .update_owned_settled(
                job_id,
                caller_id,
                Box::new(move |current| {
                    if matches!(current.state, JobState::Cancelled { .. }) {
                        return Ok(current.clone());
                    }
                    let event = Event::Cancel {
                        cause: CancelCause::User,
                    };
                    Ok(machine::apply(current, event, now)?)
                }),
                Box::new(move |stored| {
                    if stored {
                        governor.cancel(job_id);
                    }
                }),
            )
            .await;
        let job = logged("cancel", job_id, job)?;

        info!(job_id = %job_id, cause = %CancelCause::User, "Job cancelled");
        Ok(job)
    }

    /// Drops the checkpoint in any state
    pub async fn clear_checkpoint(&self, caller_id: &str, job_id: Uuid) -> Result<JobRecord> {
        let now = self.clock.now();
        let job = self
            .store
            .update_owned(
                job_id,
                caller_id,
                Box::new(move |current| Ok(machine::clear_checkpoint(current, now))),
            )
            .await;
        let job = logged("clear_checkpoint", job_id, job)?;

        info!(job_id = %job_id, "Checkpoint cleared");
        Ok(job)
    }

    // =========================================================================
    // Action log
    // =========================================================================

    pub async fn append_action(
        &self,
        caller_id: &str,
        job_id: Uuid,
        entry: AppendAction,
    ) -> Result<ActionLogEntry> {
        let mut appended = self.append_actions(caller_id, job_id, vec![entry]).await?;
        appended
            .pop()
            .ok_or_else(|| EngineError::StorageUnavailable("append returned no entry".to_string()))
    }

    /// Appends entries in order; the whole batch is validated first
    ///
    /// Entries are stored one at a time, so a storage failure keeps the
    /// ones already appended.
    pub async fn append_actions(
        &self,
        caller_id: &str,
        job_id: Uuid,
        entries: Vec<AppendAction>,
    ) -> Result<Vec<ActionLogEntry>> {
        validate_actions(&entries)?;
        self.store.get_owned(job_id, caller_id).await?;

        let mut appended = Vec::with_capacity(entries.len());
        for entry in entries {
            let recorded = self.actions.append(job_id, entry, self.clock.now()).await;
            appended.push(logged("append_action", job_id, recorded)?);
        }

        debug!(job_id = %job_id, count = appended.len(), "Appended action log entries");
        Ok(appended)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Applies `event`, then adjusts the governor once the change is stored
    ///
    /// The release happens before the job is unlocked, so a concurrent
    /// resume cannot re-admit the job between the write and the release.
    pub(crate) async fn transition(
        &self,
        caller_id: &str,
        job_id: Uuid,
        event: Event,
        effect: SlotEffect,
    ) -> Result<JobRecord> {
        let action = event.action();
        let now = self.clock.now();
        let governor = Arc::clone(&self.governor);
        let job = self
            .store
            .update_owned_settled(
                job_id,
                caller_id,
                Box::new(move |current| Ok(machine::apply(current, event, now)?)),
                Box::new(move |stored| {
                    if stored && effect == SlotEffect::Release {
                        governor.release(job_id);
                    }
                }),
            )
            .await;
        logged(action.as_str(), job_id, job)
    }

    /// Applies `event` and takes a governor slot in the same store update
    ///
    /// If the governor refuses, the record is not written. If the write
    /// fails after admission, the slot is given back before the job is
    /// unlocked.
    async fn transition_admitted(
        &self,
        caller_id: &str,
        job_id: Uuid,
        event: Event,
    ) -> Result<Admitted> {
        let action = event.action();
        let now = self.clock.now();
        let governor = Arc::clone(&self.governor);
        let granted: Arc<OnceLock<SlotGrant>> = Arc::new(OnceLock::new());

        let slot = Arc::clone(&granted);
        let admit = Arc::clone(&governor);
        let mutator: Mutator = Box::new(move |current| {
            let next = machine::apply(current, event, now)?;
            let grant = admit.admit(job_id)?;
            let _ = slot.set(grant);
            Ok(next)
        });

        let slot = Arc::clone(&granted);
        let settle: Settle = Box::new(move |stored| {
            if !stored && slot.get().is_some() {
                governor.release(job_id);
            }
        });

        let job = self
            .store
            .update_owned_settled(job_id, caller_id, mutator, settle)
            .await;
        let job = logged(action.as_str(), job_id, job)?;

        let grant = granted.get().cloned().ok_or_else(|| {
            EngineError::StorageUnavailable(format!("no slot recorded for job {}", job_id))
        })?;
        Ok(Admitted { job, grant })
    }
}

/// Logs backend failures at error level on their way out
pub(crate) fn logged<T>(op: &str, job_id: Uuid, result: Result<T>) -> Result<T> {
    if let Err(err @ EngineError::StorageUnavailable(_)) = &result {
        error!(job_id = %job_id, op = op, error = %err, "Job store failure");
    }
    result
}

fn validate_actions(entries: &[AppendAction]) -> Result<()> {
    if entries.is_empty() {
        return Err(EngineError::Validation(
            "at least one action log entry is required".to_string(),
        ));
    }

    if entries.len() > MAX_BATCH_SIZE {
        return Err(EngineError::Validation(format!(
            "Too many action log entries in batch (max: {})",
            MAX_BATCH_SIZE
        )));
    }

    for entry in entries {
        if entry.message.trim().is_empty() {
            return Err(EngineError::Validation(
                "Action log message cannot be empty".to_string(),
            ));
        }
        if entry.message.len() > MAX_MESSAGE_LENGTH {
            return Err(EngineError::Validation(format!(
                "Action log message too long (max: {} characters)",
                MAX_MESSAGE_LENGTH
            )));
        }
    }

    Ok(())
}
