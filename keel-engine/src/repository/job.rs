//! Job Repository
//!
//! Durable home of job records. Every change goes through [`JobStore::update`],
//! which runs a mutator against the current record and persists its output
//! as one step: two updates to the same job never interleave, and a mutator
//! that returns an error leaves the stored record untouched.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keel_core::domain::checkpoint::Checkpoint;
use keel_core::domain::job::{CancelCause, JobRecord, JobState, JobStatus};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::locks::KeyedLocks;
use crate::error::{EngineError, Result};

/// Computes the next version of a record from the current one
pub type Mutator = Box<dyn FnOnce(&JobRecord) -> Result<JobRecord> + Send>;

/// Told whether an update was stored; runs before the record is unlocked
pub type Settle = Box<dyn FnOnce(bool) + Send>;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts a new record; fails with `AlreadyExists` on a duplicate id
    async fn create(&self, record: JobRecord) -> Result<JobRecord>;

    async fn get(&self, id: Uuid) -> Result<JobRecord>;

    /// Atomic read-modify-write of one record
    async fn update(&self, id: Uuid, mutator: Mutator) -> Result<JobRecord> {
        self.update_settled(id, mutator, Box::new(|_| {})).await
    }

    /// Like [`JobStore::update`], then calls `settle` with whether the new
    /// record was stored, while updates to the same id are still held off
    async fn update_settled(
        &self,
        id: Uuid,
        mutator: Mutator,
        settle: Settle,
    ) -> Result<JobRecord>;

    /// Records newest first, optionally restricted to one owner
    async fn list(&self, owner_id: Option<&str>) -> Result<Vec<JobRecord>>;

    /// Reads a record on behalf of `caller_id`
    async fn get_owned(&self, id: Uuid, caller_id: &str) -> Result<JobRecord> {
        let record = self.get(id).await?;
        if !record.is_owned_by(caller_id) {
            return Err(EngineError::Forbidden(id));
        }
        Ok(record)
    }

    /// Updates a record on behalf of `caller_id`
    ///
    /// Ownership is checked inside the mutator, against the same version of
    /// the record the change is computed from.
    async fn update_owned(&self, id: Uuid, caller_id: &str, mutator: Mutator) -> Result<JobRecord> {
        self.update_owned_settled(id, caller_id, mutator, Box::new(|_| {}))
            .await
    }

    async fn update_owned_settled(
        &self,
        id: Uuid,
        caller_id: &str,
        mutator: Mutator,
        settle: Settle,
    ) -> Result<JobRecord> {
        let caller_id = caller_id.to_string();
        self.update_settled(
            id,
            Box::new(move |current| {
                if !current.is_owned_by(&caller_id) {
                    return Err(EngineError::Forbidden(id));
                }
                mutator(current)
            }),
            settle,
        )
        .await
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store, lost on restart
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Uuid, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> EngineError {
    EngineError::StorageUnavailable("job store lock poisoned".to_string())
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, record: JobRecord) -> Result<JobRecord> {
        let mut jobs = self.jobs.write().map_err(poisoned)?;
        if jobs.contains_key(&record.id()) {
            return Err(EngineError::AlreadyExists(record.id()));
        }
        jobs.insert(record.id(), record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<JobRecord> {
        let jobs = self.jobs.read().map_err(poisoned)?;
        jobs.get(&id).cloned().ok_or(EngineError::NotFound(id))
    }

    async fn update_settled(
        &self,
        id: Uuid,
        mutator: Mutator,
        settle: Settle,
    ) -> Result<JobRecord> {
        let mut jobs = match self.jobs.write() {
            Ok(jobs) => jobs,
            Err(err) => {
                settle(false);
                return Err(poisoned(err));
            }
        };

        let outcome = match jobs.get_mut(&id) {
            Some(current) => mutator(current).map(|next| {
                *current = next.clone();
                next
            }),
            None => Err(EngineError::NotFound(id)),
        };
        settle(outcome.is_ok());
        outcome
    }

    async fn list(&self, owner_id: Option<&str>) -> Result<Vec<JobRecord>> {
        let jobs = self.jobs.read().map_err(poisoned)?;
        let mut records: Vec<JobRecord> = jobs
            .values()
            .filter(|job| owner_id.is_none_or(|owner| job.is_owned_by(owner)))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

// =============================================================================
// SQLite store
// =============================================================================

/// Disk-backed store; records survive engine restarts
pub struct SqliteJobStore {
    pool: SqlitePool,
    locks: KeyedLocks,
}

impl SqliteJobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: KeyedLocks::new(),
        }
    }

    /// One read-modify-write in its own transaction; callers hold the id's lock
    async fn write(&self, id: Uuid, mutator: Mutator) -> Result<JobRecord> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, JobRow>(&format!("{SELECT_JOB} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let current: JobRecord = row.ok_or(EngineError::NotFound(id))?.try_into()?;

        let next = mutator(&current)?;
        if next == current {
            return Ok(next);
        }

        let row = JobRow::from_record(&next)?;
        sqlx::query(
            r#"
            UPDATE jobs
            SET kind = ?, state = ?, progress = ?, step = ?, error = ?, result = ?,
                cancel_cause = ?, checkpoint_step = ?, checkpoint_progress = ?,
                checkpoint_sequence = ?, checkpoint_data = ?, checkpoint_saved_at = ?,
                last_activity_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&row.kind)
        .bind(&row.state)
        .bind(row.progress)
        .bind(&row.step)
        .bind(&row.error)
        .bind(&row.result)
        .bind(&row.cancel_cause)
        .bind(&row.checkpoint_step)
        .bind(row.checkpoint_progress)
        .bind(row.checkpoint_sequence)
        .bind(&row.checkpoint_data)
        .bind(row.checkpoint_saved_at)
        .bind(row.last_activity_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(next)
    }
}

const SELECT_JOB: &str = r#"
    SELECT id, owner_id, kind, state, progress, step, error, result, cancel_cause,
           checkpoint_step, checkpoint_progress, checkpoint_sequence,
           checkpoint_data, checkpoint_saved_at, created_at, last_activity_at
    FROM jobs
"#;

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create(&self, record: JobRecord) -> Result<JobRecord> {
        let row = JobRow::from_record(&record)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO jobs (id, owner_id, kind, state, progress, step, error, result,
                              cancel_cause, checkpoint_step, checkpoint_progress,
                              checkpoint_sequence, checkpoint_data, checkpoint_saved_at,
                              created_at, last_activity_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(row.id)
        .bind(&row.owner_id)
        .bind(&row.kind)
        .bind(&row.state)
        .bind(row.progress)
        .bind(&row.step)
        .bind(&row.error)
        .bind(&row.result)
        .bind(&row.cancel_cause)
        .bind(&row.checkpoint_step)
        .bind(row.checkpoint_progress)
        .bind(row.checkpoint_sequence)
        .bind(&row.checkpoint_data)
        .bind(row.checkpoint_saved_at)
        .bind(row.created_at)
        .bind(row.last_activity_at)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(record),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(EngineError::AlreadyExists(record.id()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get(&self, id: Uuid) -> Result<JobRecord> {
        let row = sqlx::query_as::<_, JobRow>(&format!("{SELECT_JOB} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or(EngineError::NotFound(id))?.try_into()
    }

    async fn update_settled(
        &self,
        id: Uuid,
        mutator: Mutator,
        settle: Settle,
    ) -> Result<JobRecord> {
        let _guard = self.locks.lock(id).await;
        let outcome = self.write(id, mutator).await;
        settle(outcome.is_ok());
        outcome
    }

    async fn list(&self, owner_id: Option<&str>) -> Result<Vec<JobRecord>> {
        let rows = match owner_id {
            Some(owner) => {
                sqlx::query_as::<_, JobRow>(&format!(
                    "{SELECT_JOB} WHERE owner_id = ? ORDER BY created_at DESC"
                ))
                .bind(owner)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, JobRow>(&format!("{SELECT_JOB} ORDER BY created_at DESC"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(JobRecord::try_from).collect()
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    owner_id: String,
    kind: String,
    state: String,
    progress: f64,
    step: String,
    error: Option<String>,
    result: Option<String>,
    cancel_cause: Option<String>,
    checkpoint_step: Option<String>,
    checkpoint_progress: Option<f64>,
    checkpoint_sequence: Option<i64>,
    checkpoint_data: Option<Vec<u8>>,
    checkpoint_saved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}

impl JobRow {
    fn from_record(record: &JobRecord) -> Result<Self> {
        let (error, result, cancel_cause) = match &record.state {
            JobState::Failed { error } => (Some(error.clone()), None, None),
            JobState::Completed { result } => {
                let encoded = serde_json::to_string(result)
                    .map_err(|e| EngineError::Validation(format!("unencodable result: {}", e)))?;
                (None, Some(encoded), None)
            }
            JobState::Cancelled { cause } => (None, None, Some(cause.as_str().to_string())),
            _ => (None, None, None),
        };

        let checkpoint = record.checkpoint.as_ref();
        let checkpoint_sequence = checkpoint
            .map(|c| i64::try_from(c.sequence))
            .transpose()
            .map_err(|_| EngineError::Validation("checkpoint sequence out of range".to_string()))?;

        Ok(Self {
            id: record.id(),
            owner_id: record.owner_id().to_string(),
            kind: record.kind.clone(),
            state: record.status().as_str().to_string(),
            progress: record.progress,
            step: record.step.clone(),
            error,
            result,
            cancel_cause,
            checkpoint_step: checkpoint.map(|c| c.step.clone()),
            checkpoint_progress: checkpoint.map(|c| c.progress),
            checkpoint_sequence,
            checkpoint_data: checkpoint.map(|c| c.data.clone()),
            checkpoint_saved_at: checkpoint.map(|c| c.saved_at),
            created_at: record.created_at,
            last_activity_at: record.last_activity_at,
        })
    }
}

fn corrupt(id: Uuid, what: impl std::fmt::Display) -> EngineError {
    EngineError::StorageUnavailable(format!("corrupt row for job {}: {}", id, what))
}

impl TryFrom<JobRow> for JobRecord {
    type Error = EngineError;

    fn try_from(row: JobRow) -> Result<Self> {
        let id = row.id;
        let status: JobStatus = row.state.parse().map_err(|e| corrupt(id, e))?;

        let state = match status {
            JobStatus::Created => JobState::Created,
            JobStatus::Running => JobState::Running,
            JobStatus::Paused => JobState::Paused,
            JobStatus::Completed => {
                let result = match row.result {
                    Some(text) => serde_json::from_str(&text).map_err(|e| corrupt(id, e))?,
                    None => serde_json::Value::Null,
                };
                JobState::Completed { result }
            }
            JobStatus::Failed => JobState::Failed {
                error: row.error.ok_or_else(|| corrupt(id, "failed without error"))?,
            },
            JobStatus::Cancelled => {
                let cause: CancelCause = row
                    .cancel_cause
                    .as_deref()
                    .ok_or_else(|| corrupt(id, "cancelled without cause"))?
                    .parse()
                    .map_err(|e| corrupt(id, e))?;
                JobState::Cancelled { cause }
            }
        };

        let checkpoint = match (
            row.checkpoint_step,
            row.checkpoint_progress,
            row.checkpoint_sequence,
            row.checkpoint_data,
            row.checkpoint_saved_at,
        ) {
            (Some(step), Some(progress), Some(sequence), Some(data), Some(saved_at)) => {
                Some(Checkpoint {
                    step,
                    progress,
                    sequence: u64::try_from(sequence).map_err(|e| corrupt(id, e))?,
                    data,
                    saved_at,
                })
            }
            (None, None, None, None, None) => None,
            _ => return Err(corrupt(id, "partial checkpoint")),
        };

        let mut record = JobRecord::with_id(id, row.owner_id, row.kind, row.created_at);
        record.state = state;
        record.progress = row.progress;
        record.step = row.step;
        record.checkpoint = checkpoint;
        record.last_activity_at = row.last_activity_at;
        Ok(record)
    }
}
