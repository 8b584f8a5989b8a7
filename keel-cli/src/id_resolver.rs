//! ID resolver module
//!
//! Lets users type a short, unambiguous prefix instead of a full job UUID.
//! Prefixes are matched against the caller's own jobs.

use anyhow::{Context, Result, anyhow};
use keel_client::EngineClient;
use uuid::Uuid;

use crate::types::IdOrPrefix;

/// Resolve a job ID or prefix to a full UUID
///
/// Full UUIDs are returned as is, without a round trip to the engine.
pub async fn resolve_job_id(client: &EngineClient, input: &str) -> Result<Uuid> {
    let prefix = match IdOrPrefix::parse(input) {
        IdOrPrefix::Full(uuid) => return Ok(uuid),
        IdOrPrefix::Prefix(prefix) => prefix,
    };

    let jobs = client
        .list_jobs()
        .await
        .context("Failed to fetch jobs for ID resolution")?;

    match_prefix(jobs.iter().map(|j| j.id()), &prefix)
}

fn match_prefix(ids: impl Iterator<Item = Uuid>, prefix: &str) -> Result<Uuid> {
    if prefix.is_empty() {
        return Err(anyhow!("Job ID cannot be empty"));
    }

    let matches: Vec<Uuid> = ids
        .filter(|id| id.to_string().starts_with(prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!("No job found with ID starting with '{}'", prefix)),
        [id] => Ok(*id),
        _ => {
            let ids: Vec<String> = matches.iter().map(|id| id.to_string()).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple jobs: {}",
                prefix,
                ids.join(", ")
            ))
        }
    }
}
