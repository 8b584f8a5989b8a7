//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::checkpoint::Checkpoint;

/// Step shown for a freshly created job when the caller gives none
pub const QUEUED_STEP: &str = "Queued";

/// Step a job is reset to by `restart`
pub const RESTARTED_STEP: &str = "Restarted";

/// Job record
///
/// One per unit of background work. The engine persists it; the UI and
/// executors read it. `id` and `owner_id` are fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    id: Uuid,
    owner_id: String,
    pub kind: String,
    #[serde(flatten)]
    pub state: JobState,
    pub progress: f64,
    pub step: String,
    pub checkpoint: Option<Checkpoint>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl JobRecord {
    /// Creates a job in the `created` state with a fresh id
    pub fn new(owner_id: impl Into<String>, kind: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self::with_id(Uuid::new_v4(), owner_id, kind, now)
    }

    /// Creates a job in the `created` state with a known id
    pub fn with_id(
        id: Uuid,
        owner_id: impl Into<String>,
        kind: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id: owner_id.into(),
            kind: kind.into(),
            state: JobState::Created,
            progress: 0.0,
            step: QUEUED_STEP.to_string(),
            checkpoint: None,
            created_at: now,
            last_activity_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn is_owned_by(&self, caller_id: &str) -> bool {
        self.owner_id == caller_id
    }

    pub fn status(&self) -> JobStatus {
        self.state.status()
    }

    /// Error text, present only for failed jobs
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            JobState::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Result payload, present only for completed jobs
    pub fn result(&self) -> Option<&serde_json::Value> {
        match &self.state {
            JobState::Completed { result } => Some(result),
            _ => None,
        }
    }

    pub fn cancel_cause(&self) -> Option<CancelCause> {
        match self.state {
            JobState::Cancelled { cause } => Some(cause),
            _ => None,
        }
    }

    pub fn checkpoint_sequence(&self) -> Option<u64> {
        self.checkpoint.as_ref().map(|c| c.sequence)
    }
}

/// Job lifecycle state
///
/// Each variant carries only the fields that are valid in that state, so a
/// record can never hold both an error and a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum JobState {
    Created,
    Running,
    Paused,
    Completed {
        result: serde_json::Value,
    },
    Failed {
        error: String,
    },
    Cancelled {
        #[serde(rename = "cancelCause")]
        cause: CancelCause,
    },
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Created => JobStatus::Created,
            JobState::Running => JobStatus::Running,
            JobState::Paused => JobStatus::Paused,
            JobState::Completed { .. } => JobStatus::Completed,
            JobState::Failed { .. } => JobStatus::Failed,
            JobState::Cancelled { .. } => JobStatus::Cancelled,
        }
    }
}

/// Job state discriminant without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    Created,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal with respect to normal execution; only `restart` leaves these
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Created => "created",
            JobStatus::Running => "running",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(JobStatus::Created),
            "running" => Ok(JobStatus::Running),
            "paused" => Ok(JobStatus::Paused),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who or what cancelled a job
///
/// Same state transition regardless of cause; the cause is kept so user
/// cancels can be told apart from ones the engine issued itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CancelCause {
    /// Explicit cancel from the job owner
    User,
    /// Maximum runtime exceeded
    Timeout,
    /// Execution slot handed to a newer unit of work
    Preempted,
}

impl CancelCause {
    pub fn as_str(self) -> &'static str {
        match self {
            CancelCause::User => "user",
            CancelCause::Timeout => "timeout",
            CancelCause::Preempted => "preempted",
        }
    }
}

impl std::str::FromStr for CancelCause {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(CancelCause::User),
            "timeout" => Ok(CancelCause::Timeout),
            "preempted" => Ok(CancelCause::Preempted),
            other => Err(format!("unknown cancel cause '{}'", other)),
        }
    }
}

impl std::fmt::Display for CancelCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_job_defaults() {
        let now = Utc::now();
        let job = JobRecord::new("u1", "agent-run", now);

        assert_eq!(job.status(), JobStatus::Created);
        assert_eq!(job.owner_id(), "u1");
        assert_eq!(job.step, QUEUED_STEP);
        assert_eq!(job.progress, 0.0);
        assert!(job.error().is_none());
        assert!(job.result().is_none());
        assert_eq!(job.last_activity_at, now);
    }

    #[test]
    fn test_failed_state_flattens_into_record() {
        let mut job = JobRecord::new("u1", "search", Utc::now());
        job.state = JobState::Failed {
            error: "Network timeout".to_string(),
        };

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["state"], "failed");
        assert_eq!(value["error"], "Network timeout");
        assert!(value.get("result").is_none());
        assert_eq!(value["ownerId"], "u1");

        let back: JobRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn test_cancelled_state_carries_cause() {
        let mut job = JobRecord::new("u1", "search", Utc::now());
        job.state = JobState::Cancelled {
            cause: CancelCause::Timeout,
        };

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["state"], "cancelled");
        assert_eq!(value["cancelCause"], "timeout");
        assert_eq!(job.cancel_cause(), Some(CancelCause::Timeout));
    }

    #[test]
    fn test_completed_state_exposes_result() {
        let mut job = JobRecord::new("u1", "analysis", Utc::now());
        job.state = JobState::Completed {
            result: json!({"pages": 3}),
        };

        assert_eq!(job.result(), Some(&json!({"pages": 3})));
        assert!(job.error().is_none());
        assert!(job.status().is_terminal());
    }

    #[test]
    fn test_status_parses_its_own_name() {
        assert_eq!("paused".parse::<JobStatus>(), Ok(JobStatus::Paused));
        assert_eq!("preempted".parse::<CancelCause>(), Ok(CancelCause::Preempted));
        assert!("Paused".parse::<JobStatus>().is_err());
    }
}
