//! Job-related API endpoints

use keel_core::domain::job::JobRecord;
use keel_core::dto::job::{
    CheckpointAck, CheckpointUpdate, CompleteJob, CreateJob, FailJob, ProgressUpdate,
    ResumeResponse, StartResponse,
};
use uuid::Uuid;

use crate::EngineClient;
use crate::error::Result;

impl EngineClient {
    // =============================================================================
    // Job Lifecycle
    // =============================================================================

    /// Create a new job owned by this client's caller
    ///
    /// # Example
    /// ```no_run
    /// # use keel_client::EngineClient;
    /// # use keel_core::dto::job::CreateJob;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = EngineClient::new("http://localhost:8080", "alice");
    /// let job = client.create_job(CreateJob {
    ///     kind: "crawl".to_string(),
    ///     step: Some("Waiting for seed URLs".to_string()),
    /// }).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_job(&self, req: CreateJob) -> Result<JobRecord> {
        let response = self.post("/jobs").json(&req).send().await?;
        self.handle_response(response).await
    }

    /// List the caller's jobs, newest first
    pub async fn list_jobs(&self) -> Result<Vec<JobRecord>> {
        let response = self.get("/jobs").send().await?;
        self.handle_response(response).await
    }

    /// Full record including the checkpoint
    pub async fn get_job(&self, job_id: Uuid) -> Result<JobRecord> {
        let response = self.get(&format!("/jobs/{}", job_id)).send().await?;
        self.handle_response(response).await
    }

    pub async fn start_job(&self, job_id: Uuid) -> Result<StartResponse> {
        let response = self.post(&format!("/jobs/{}/start", job_id)).send().await?;
        self.handle_response(response).await
    }

    pub async fn pause_job(&self, job_id: Uuid) -> Result<JobRecord> {
        let response = self.post(&format!("/jobs/{}/pause", job_id)).send().await?;
        self.handle_response(response).await
    }

    /// Resume a paused job from its last checkpoint
    pub async fn resume_job(&self, job_id: Uuid) -> Result<ResumeResponse> {
        let response = self.post(&format!("/jobs/{}/resume", job_id)).send().await?;
        self.handle_response(response).await
    }

    pub async fn restart_job(&self, job_id: Uuid) -> Result<JobRecord> {
        let response = self.post(&format!("/jobs/{}/restart", job_id)).send().await?;
        self.handle_response(response).await
    }

    /// Cancel a job; cancelling an already cancelled job succeeds
    pub async fn cancel_job(&self, job_id: Uuid) -> Result<JobRecord> {
        let response = self.post(&format!("/jobs/{}/cancel", job_id)).send().await?;
        self.handle_response(response).await
    }

    pub async fn clear_checkpoint(&self, job_id: Uuid) -> Result<JobRecord> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/jobs/{}/checkpoint", job_id))
            .send()
            .await?;
        self.handle_response(response).await
    }

    // =============================================================================
    // Executor Reports
    // =============================================================================

    /// Offer a checkpoint
    ///
    /// Check `cancel_requested` on the answer: when set, the job is no longer
    /// running and the executor should stop.
    pub async fn write_checkpoint(
        &self,
        job_id: Uuid,
        update: &CheckpointUpdate,
    ) -> Result<CheckpointAck> {
        let response = self
            .request(reqwest::Method::PUT, &format!("/jobs/{}/checkpoint", job_id))
            .json(update)
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn report_progress(&self, job_id: Uuid, update: &ProgressUpdate) -> Result<JobRecord> {
        let response = self
            .post(&format!("/jobs/{}/progress", job_id))
            .json(update)
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn complete_job(&self, job_id: Uuid, req: &CompleteJob) -> Result<JobRecord> {
        let response = self
            .post(&format!("/jobs/{}/complete", job_id))
            .json(req)
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn fail_job(&self, job_id: Uuid, req: &FailJob) -> Result<JobRecord> {
        let response = self
            .post(&format!("/jobs/{}/fail", job_id))
            .json(req)
            .send()
            .await?;
        self.handle_response(response).await
    }
}
