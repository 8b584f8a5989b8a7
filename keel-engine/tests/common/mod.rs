//! Shared setup for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use keel_core::dto::job::{CheckpointUpdate, CreateJob};
use keel_engine::clock::ManualClock;
use keel_engine::db;
use keel_engine::governor::{Governor, GovernorConfig, PreemptionPolicy, Revocation};
use keel_engine::repository::{
    ActionLog, JobStore, MemoryActionLog, MemoryJobStore, SqliteActionLog, SqliteJobStore,
};
use keel_engine::service::Coordinator;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub enum Backend {
    Memory,
    Sqlite,
}

pub const BACKENDS: [Backend; 2] = [Backend::Memory, Backend::Sqlite];

pub struct Harness {
    pub coordinator: Arc<Coordinator>,
    pub governor: Arc<Governor>,
    pub clock: Arc<ManualClock>,
    pub revocations: mpsc::UnboundedReceiver<Revocation>,
}

pub fn governor_config(slots: usize, policy: PreemptionPolicy) -> GovernorConfig {
    GovernorConfig {
        slots,
        max_runtime: Duration::from_secs(600),
        policy,
    }
}

pub async fn harness(backend: Backend) -> Harness {
    harness_with(backend, GovernorConfig::default()).await
}

pub async fn harness_with(backend: Backend, config: GovernorConfig) -> Harness {
    let (store, actions): (Arc<dyn JobStore>, Arc<dyn ActionLog>) = match backend {
        Backend::Memory => (
            Arc::new(MemoryJobStore::new()),
            Arc::new(MemoryActionLog::new()),
        ),
        Backend::Sqlite => {
            let pool = db::create_memory_pool().await.unwrap();
            db::run_migrations(&pool).await.unwrap();
            (
                Arc::new(SqliteJobStore::new(pool.clone())),
                Arc::new(SqliteActionLog::new(pool)),
            )
        }
    };
    harness_on(store, actions, config)
}

/// Harness over caller-supplied stores
pub fn harness_on(
    store: Arc<dyn JobStore>,
    actions: Arc<dyn ActionLog>,
    config: GovernorConfig,
) -> Harness {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    ));
    let (governor, revocations) = Governor::new(config, clock.clone());
    let governor = Arc::new(governor);
    governor.init();

    let coordinator = Arc::new(Coordinator::new(
        store,
        actions,
        Arc::clone(&governor),
        clock.clone(),
    ));

    Harness {
        coordinator,
        governor,
        clock,
        revocations,
    }
}

impl Harness {
    pub async fn create(&self, owner: &str, kind: &str) -> Uuid {
        let job = self
            .coordinator
            .create(
                owner,
                CreateJob {
                    kind: kind.to_string(),
                    step: None,
                },
            )
            .await
            .unwrap();
        self.clock.advance(chrono::Duration::seconds(1));
        job.id()
    }

    pub async fn create_running(&self, owner: &str, kind: &str) -> Uuid {
        let id = self.create(owner, kind).await;
        self.coordinator.start(owner, id).await.unwrap();
        id
    }
}

pub fn checkpoint(step: &str, progress: f64, sequence: u64) -> CheckpointUpdate {
    CheckpointUpdate {
        step: step.to_string(),
        progress,
        sequence,
        data: format!("state-{}", sequence).into_bytes(),
    }
}
