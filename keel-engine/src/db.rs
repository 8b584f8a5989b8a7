use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await
}

/// Single-connection pool for tests and throwaway engines
///
/// Every connection to `sqlite::memory:` opens its own database, so the pool
/// is pinned to one connection that never idles out.
pub async fn create_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Create jobs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id BLOB PRIMARY KEY,
            owner_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            state TEXT NOT NULL,
            progress REAL NOT NULL,
            step TEXT NOT NULL,
            error TEXT,
            result TEXT,
            cancel_cause TEXT,
            checkpoint_step TEXT,
            checkpoint_progress REAL,
            checkpoint_sequence INTEGER,
            checkpoint_data BLOB,
            checkpoint_saved_at TEXT,
            created_at TEXT NOT NULL,
            last_activity_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create action log table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS action_log (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id BLOB NOT NULL REFERENCES jobs(id),
            kind TEXT NOT NULL,
            message TEXT NOT NULL,
            detail TEXT,
            recorded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for better query performance
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_owner_id ON jobs(owner_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_action_log_job_id ON action_log(job_id, seq)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
