//! Engine configuration
//!
//! Defines the configurable parameters of the engine host: where it listens,
//! which job store backs it, and how the concurrency governor admits work.

use std::time::Duration;

use crate::governor::{GovernorConfig, PreemptionPolicy};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP API binds to
    pub bind_addr: String,

    /// SQLite URL for the disk-backed store; `None` keeps jobs in memory
    pub database_url: Option<String>,

    /// Units of work allowed to execute at once
    pub max_concurrent: usize,

    /// Wall-clock limit for any admitted unit of work
    pub max_runtime: Duration,

    /// What to do when every slot is taken
    pub preemption: PreemptionPolicy,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Recognised environment variables:
    /// - KEEL_BIND_ADDR (default: 127.0.0.1:8080)
    /// - KEEL_DATABASE_URL (optional, e.g. sqlite://keel.db)
    /// - KEEL_MAX_CONCURRENT (default: 1)
    /// - KEEL_MAX_RUNTIME (seconds, default: 1800)
    /// - KEEL_PREEMPTION (preempt | reject, default: preempt)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let bind_addr = std::env::var("KEEL_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let database_url = std::env::var("KEEL_DATABASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let max_concurrent = match std::env::var("KEEL_MAX_CONCURRENT") {
            Ok(s) => s
                .parse::<usize>()
                .map_err(|_| anyhow::anyhow!("KEEL_MAX_CONCURRENT must be a number, got '{}'", s))?,
            Err(_) => defaults.max_concurrent,
        };

        let max_runtime = match std::env::var("KEEL_MAX_RUNTIME") {
            Ok(s) => s
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| anyhow::anyhow!("KEEL_MAX_RUNTIME must be seconds, got '{}'", s))?,
            Err(_) => defaults.max_runtime,
        };

        let preemption = match std::env::var("KEEL_PREEMPTION") {
            Ok(s) => s.parse::<PreemptionPolicy>()?,
            Err(_) => defaults.preemption,
        };

        Ok(Self {
            bind_addr,
            database_url,
            max_concurrent,
            max_runtime,
            preemption,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if let Some(url) = &self.database_url {
            if !url.starts_with("sqlite:") {
                anyhow::bail!("database_url must be a sqlite: URL");
            }
        }

        if self.max_concurrent == 0 {
            anyhow::bail!("max_concurrent must be greater than 0");
        }

        if self.max_runtime.as_secs() == 0 {
            anyhow::bail!("max_runtime must be greater than 0");
        }

        Ok(())
    }

    pub fn governor(&self) -> GovernorConfig {
        GovernorConfig {
            slots: self.max_concurrent,
            max_runtime: self.max_runtime,
            policy: self.preemption,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            database_url: None,
            max_concurrent: 1,
            max_runtime: Duration::from_secs(1800),
            preemption: PreemptionPolicy::Preempt,
        }
    }
}
