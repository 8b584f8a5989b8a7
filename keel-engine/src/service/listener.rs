//! System cancellation listener
//!
//! Turns governor revocations (timeouts and preemptions) into recorded
//! cancellations, so the stored state matches what the governor did.

use std::sync::Arc;

use keel_core::domain::job::{JobRecord, JobStatus};
use keel_core::machine::{self, Event};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::coordinator::Coordinator;
use crate::error::{EngineError, Result};
use crate::governor::Revocation;

/// Applies revocations until the governor is dropped
pub fn spawn_revocation_listener(
    coordinator: Arc<Coordinator>,
    mut revocations: mpsc::UnboundedReceiver<Revocation>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(revocation) = revocations.recv().await {
            match coordinator.apply_revocation(revocation).await {
                Ok(_) => {}
                Err(EngineError::NotFound(job_id)) => {
                    warn!(job_id = %job_id, "Revocation for unknown job");
                }
                Err(err) => {
                    error!(
                        job_id = %revocation.job_id,
                        cause = %revocation.cause,
                        error = %err,
                        "Failed to record system cancellation"
                    );
                }
            }
        }
        debug!("Revocation channel closed");
    })
}

impl Coordinator {
    /// Records a system-issued cancel
    ///
    /// Jobs that already left `running` (paused, completed, failed or
    /// cancelled in the meantime) are left as they are, and so are jobs
    /// that were admitted again after the revoked run.
    pub async fn apply_revocation(&self, revocation: Revocation) -> Result<JobRecord> {
        let Revocation {
            job_id,
            cause,
            generation,
        } = revocation;
        let now = self.clock.now();
        let governor = Arc::clone(&self.governor);

        let job = self
            .store
            .update(
                job_id,
                Box::new(move |current| {
                    if current.status() != JobStatus::Running
                        || !governor.is_current(job_id, generation)
                    {
                        return Ok(current.clone());
                    }
                    Ok(machine::apply(current, Event::Cancel { cause }, now)?)
                }),
            )
            .await?;

        if job.cancel_cause() == Some(cause) {
            info!(job_id = %job_id, cause = %cause, "Job cancelled by the engine");
        } else {
            debug!(
                job_id = %job_id,
                cause = %cause,
                state = %job.status(),
                "Revocation ignored, job is no longer running that admission"
            );
        }
        Ok(job)
    }
}
