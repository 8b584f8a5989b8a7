//! Action Log Repository
//!
//! Append-only storage for per-job reasoning entries.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keel_core::domain::action::{ActionKind, ActionLogEntry};
use keel_core::dto::action::AppendAction;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{EngineError, Result};

#[async_trait]
pub trait ActionLog: Send + Sync {
    async fn append(
        &self,
        job_id: Uuid,
        entry: AppendAction,
        recorded_at: DateTime<Utc>,
    ) -> Result<ActionLogEntry>;

    /// Entries of one job in insertion order
    async fn list(&self, job_id: Uuid) -> Result<Vec<ActionLogEntry>>;
}

#[derive(Default)]
struct MemoryLog {
    last_seq: u64,
    entries: Vec<ActionLogEntry>,
}

#[derive(Default)]
pub struct MemoryActionLog {
    log: Mutex<MemoryLog>,
}

impl MemoryActionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActionLog for MemoryActionLog {
    async fn append(
        &self,
        job_id: Uuid,
        entry: AppendAction,
        recorded_at: DateTime<Utc>,
    ) -> Result<ActionLogEntry> {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.last_seq += 1;

        let entry = ActionLogEntry {
            job_id,
            seq: log.last_seq,
            kind: entry.kind,
            message: entry.message,
            detail: entry.detail,
            recorded_at,
        };
        log.entries.push(entry.clone());
        Ok(entry)
    }

    async fn list(&self, job_id: Uuid) -> Result<Vec<ActionLogEntry>> {
        let log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(log
            .entries
            .iter()
            .filter(|e| e.job_id == job_id)
            .cloned()
            .collect())
    }
}

pub struct SqliteActionLog {
    pool: SqlitePool,
}

impl SqliteActionLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActionLog for SqliteActionLog {
    async fn append(
        &self,
        job_id: Uuid,
        entry: AppendAction,
        recorded_at: DateTime<Utc>,
    ) -> Result<ActionLogEntry> {
        let detail = entry
            .detail
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| EngineError::Validation(format!("unencodable detail: {}", e)))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO action_log (job_id, kind, message, detail, recorded_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(job_id)
        .bind(entry.kind.as_str())
        .bind(&entry.message)
        .bind(detail)
        .bind(recorded_at)
        .execute(&self.pool)
        .await?;

        Ok(ActionLogEntry {
            job_id,
            seq: inserted.last_insert_rowid() as u64,
            kind: entry.kind,
            message: entry.message,
            detail: entry.detail,
            recorded_at,
        })
    }

    async fn list(&self, job_id: Uuid) -> Result<Vec<ActionLogEntry>> {
        let rows = sqlx::query_as::<_, ActionRow>(
            r#"
            SELECT seq, job_id, kind, message, detail, recorded_at
            FROM action_log
            WHERE job_id = ?
            ORDER BY seq ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ActionLogEntry::try_from).collect()
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ActionRow {
    seq: i64,
    job_id: Uuid,
    kind: String,
    message: String,
    detail: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<ActionRow> for ActionLogEntry {
    type Error = EngineError;

    fn try_from(row: ActionRow) -> Result<Self> {
        let kind = ActionKind::parse(&row.kind).ok_or_else(|| {
            EngineError::StorageUnavailable(format!("unknown action kind '{}'", row.kind))
        })?;
        let detail = row
            .detail
            .map(|text| serde_json::from_str(&text))
            .transpose()
            .map_err(|e| EngineError::StorageUnavailable(format!("corrupt action detail: {}", e)))?;

        Ok(ActionLogEntry {
            job_id: row.job_id,
            seq: row.seq as u64,
            kind,
            message: row.message,
            detail,
            recorded_at: row.recorded_at,
        })
    }
}
