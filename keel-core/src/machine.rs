//! Job state machine
//!
//! Pure transition function over [`JobRecord`]. Given a requested event and
//! the current record it returns the next record or a [`TransitionError`];
//! it never touches storage.
//!
//! | action   | from                       | to        |
//! |----------|----------------------------|-----------|
//! | start    | created                    | running   |
//! | pause    | running                    | paused    |
//! | resume   | paused                     | running   |
//! | complete | running                    | completed |
//! | fail     | running                    | failed    |
//! | cancel   | created, running, paused   | cancelled |
//! | restart  | failed, cancelled, completed | created |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::checkpoint::{Checkpoint, CheckpointWrite};
use crate::domain::job::{CancelCause, JobRecord, JobState, JobStatus, RESTARTED_STEP};

/// Operations that are checked against the current job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Start,
    Pause,
    Resume,
    Complete,
    Fail,
    Cancel,
    Restart,
    ReportProgress,
    WriteCheckpoint,
}

impl Action {
    /// States from which this action is accepted
    pub fn sources(self) -> &'static [JobStatus] {
        use JobStatus::*;
        match self {
            Action::Start => &[Created],
            Action::Pause => &[Running],
            Action::Resume => &[Paused],
            Action::Complete | Action::Fail | Action::ReportProgress => &[Running],
            Action::Cancel => &[Created, Running, Paused],
            Action::Restart => &[Failed, Cancelled, Completed],
            // late writes from an executor that is winding down after a pause
            Action::WriteCheckpoint => &[Running, Paused],
        }
    }

    pub fn allowed_from(self, status: JobStatus) -> bool {
        self.sources().contains(&status)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Pause => "pause",
            Action::Resume => "resume",
            Action::Complete => "complete",
            Action::Fail => "fail",
            Action::Cancel => "cancel",
            Action::Restart => "restart",
            Action::ReportProgress => "report progress on",
            Action::WriteCheckpoint => "checkpoint",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected transition; the record is left as it was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {action} a job that is {state}")]
pub struct TransitionError {
    pub action: Action,
    pub state: JobStatus,
}

/// A state-changing event together with the data it carries
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start,
    Pause,
    /// Moves back to running, restoring step and progress from the checkpoint
    Resume,
    Complete { result: serde_json::Value },
    Fail { error: String },
    Cancel { cause: CancelCause },
    Restart,
}

impl Event {
    pub fn action(&self) -> Action {
        match self {
            Event::Start => Action::Start,
            Event::Pause => Action::Pause,
            Event::Resume => Action::Resume,
            Event::Complete { .. } => Action::Complete,
            Event::Fail { .. } => Action::Fail,
            Event::Cancel { .. } => Action::Cancel,
            Event::Restart => Action::Restart,
        }
    }
}

/// Checks that `action` is legal for the record's current state
pub fn guard(record: &JobRecord, action: Action) -> Result<(), TransitionError> {
    let state = record.status();
    if action.allowed_from(state) {
        Ok(())
    } else {
        Err(TransitionError { action, state })
    }
}

/// Computes the record that results from applying `event`
pub fn apply(
    record: &JobRecord,
    event: Event,
    now: DateTime<Utc>,
) -> Result<JobRecord, TransitionError> {
    guard(record, event.action())?;

    let mut next = record.clone();
    next.last_activity_at = now;

    match event {
        Event::Start => next.state = JobState::Running,
        Event::Pause => next.state = JobState::Paused,
        Event::Resume => {
            if let Some(checkpoint) = &record.checkpoint {
                next.step = checkpoint.step.clone();
                next.progress = checkpoint.progress;
            }
            next.state = JobState::Running;
        }
        Event::Complete { result } => {
            next.progress = 100.0;
            next.state = JobState::Completed { result };
        }
        Event::Fail { error } => next.state = JobState::Failed { error },
        Event::Cancel { cause } => next.state = JobState::Cancelled { cause },
        Event::Restart => {
            next.progress = 0.0;
            next.step = RESTARTED_STEP.to_string();
            next.state = JobState::Created;
        }
    }

    Ok(next)
}

/// Updates live step and progress of a running job
///
/// Progress never moves backwards while running; a lower value keeps the
/// current one.
pub fn report_progress(
    record: &JobRecord,
    step: String,
    progress: f64,
    now: DateTime<Utc>,
) -> Result<JobRecord, TransitionError> {
    guard(record, Action::ReportProgress)?;

    let mut next = record.clone();
    next.step = step;
    next.progress = progress.max(record.progress);
    next.last_activity_at = now;
    Ok(next)
}

/// Offers a checkpoint to a running or paused job
///
/// A stale sequence leaves the record untouched, including its activity
/// timestamp.
pub fn write_checkpoint(
    record: &JobRecord,
    checkpoint: Checkpoint,
    now: DateTime<Utc>,
) -> Result<(JobRecord, CheckpointWrite), TransitionError> {
    guard(record, Action::WriteCheckpoint)?;

    let mut next = record.clone();
    let outcome = Checkpoint::offer(&mut next.checkpoint, checkpoint);
    if outcome == CheckpointWrite::Applied {
        next.last_activity_at = now;
    }
    Ok((next, outcome))
}

/// Drops the checkpoint regardless of state
pub fn clear_checkpoint(record: &JobRecord, now: DateTime<Utc>) -> JobRecord {
    let mut next = record.clone();
    if next.checkpoint.take().is_some() {
        next.last_activity_at = now;
    }
    next
}
