use std::sync::Arc;

use anyhow::Context;
use keel_engine::clock::{Clock, SystemClock};
use keel_engine::config::Config;
use keel_engine::governor::Governor;
use keel_engine::repository::{
    ActionLog, JobStore, MemoryActionLog, MemoryJobStore, SqliteActionLog, SqliteJobStore,
};
use keel_engine::service::{Coordinator, spawn_revocation_listener};
use keel_engine::{api, db};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keel_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Keel engine...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let (store, actions): (Arc<dyn JobStore>, Arc<dyn ActionLog>) = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::create_pool(url)
                .await
                .context("Failed to create database pool")?;
            db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            (
                Arc::new(SqliteJobStore::new(pool.clone())),
                Arc::new(SqliteActionLog::new(pool)),
            )
        }
        None => {
            tracing::warn!("KEEL_DATABASE_URL not set, jobs are kept in memory only");
            (
                Arc::new(MemoryJobStore::new()),
                Arc::new(MemoryActionLog::new()),
            )
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (governor, revocations) = Governor::new(config.governor(), Arc::clone(&clock));
    let governor = Arc::new(governor);
    governor.init();

    let coordinator = Arc::new(Coordinator::new(
        store,
        actions,
        Arc::clone(&governor),
        clock,
    ));
    let listener_task = spawn_revocation_listener(Arc::clone(&coordinator), revocations);

    // Build router with all API endpoints
    let app = api::create_router(coordinator);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested");
        })
        .await
        .context("Server error")?;

    governor.shutdown();
    listener_task.abort();

    tracing::info!("Keel engine stopped");
    Ok(())
}
