//! Action log and governor endpoints

use keel_core::domain::action::ActionLogEntry;
use keel_core::dto::action::AppendAction;
use keel_core::dto::governor::GovernorStatus;
use uuid::Uuid;

use crate::EngineClient;
use crate::error::Result;

impl EngineClient {
    /// Entries of a job's action log in insertion order
    pub async fn list_actions(&self, job_id: Uuid) -> Result<Vec<ActionLogEntry>> {
        let response = self.get(&format!("/jobs/{}/actions", job_id)).send().await?;
        self.handle_response(response).await
    }

    /// Append entries to a job's action log
    ///
    /// Every entry is validated before any is stored, so an invalid entry
    /// rejects the whole batch. A storage failure partway through can leave
    /// the earlier entries appended.
    pub async fn append_actions(
        &self,
        job_id: Uuid,
        entries: &[AppendAction],
    ) -> Result<Vec<ActionLogEntry>> {
        let response = self
            .post(&format!("/jobs/{}/actions", job_id))
            .json(entries)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Current slot holders
    pub async fn governor_status(&self) -> Result<GovernorStatus> {
        let response = self.get("/governor").send().await?;
        self.handle_response(response).await
    }
}
