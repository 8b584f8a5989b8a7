//! Keel HTTP Client
//!
//! A type-safe HTTP client for the Keel engine API, shared by the operator
//! CLI and by remote executors reporting checkpoints.
//!
//! Every request carries the caller identity the engine checks job
//! ownership against.
//!
//! # Example
//!
//! ```no_run
//! use keel_client::EngineClient;
//! use keel_core::dto::job::CreateJob;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = EngineClient::new("http://localhost:8080", "alice");
//!
//!     let job = client.create_job(CreateJob {
//!         kind: "research".to_string(),
//!         step: None,
//!     }).await?;
//!     let started = client.start_job(job.id()).await?;
//!
//!     println!("Started job {} ({})", started.job.id(), started.job.status());
//!     Ok(())
//! }
//! ```

mod actions;
pub mod error;
mod jobs;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// Header carrying the caller identity
pub const CALLER_HEADER: &str = "x-keel-caller";

/// HTTP client for the Keel engine API
///
/// Methods are grouped by concern:
/// - Job lifecycle (create, start, pause, resume, restart, cancel)
/// - Executor reports (checkpoint, progress, complete, fail)
/// - Action log and governor introspection
#[derive(Debug, Clone)]
pub struct EngineClient {
    /// Base URL of the engine (e.g., "http://localhost:8080")
    base_url: String,
    /// Identity sent with every request
    caller_id: String,
    /// HTTP client instance
    client: Client,
}

impl EngineClient {
    /// Create a new engine client acting as `caller_id`
    ///
    /// # Example
    /// ```
    /// use keel_client::EngineClient;
    ///
    /// let client = EngineClient::new("http://localhost:8080", "alice");
    /// ```
    pub fn new(base_url: impl Into<String>, caller_id: impl Into<String>) -> Self {
        Self::with_client(base_url, caller_id, Client::new())
    }

    /// Create a new engine client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(
        base_url: impl Into<String>,
        caller_id: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            caller_id: caller_id.into(),
            client,
        }
    }

    /// Get the base URL of the engine
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn caller_id(&self) -> &str {
        &self.caller_id
    }

    /// Check that the engine is up
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Request Helpers
    // =============================================================================

    fn get(&self, path: &str) -> RequestBuilder {
        self.request(reqwest::Method::GET, path)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.request(reqwest::Method::POST, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);
        self.client
            .request(method, url)
            .header(CALLER_HEADER, &self.caller_id)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response whose body is not needed
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}
