//! Configuration module
//!
//! Handles CLI configuration: which engine to talk to and as whom.

use keel_client::EngineClient;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the engine service
    pub engine_url: String,
    /// Identity sent with every request
    pub caller_id: String,
}

impl Config {
    pub fn client(&self) -> EngineClient {
        EngineClient::new(&self.engine_url, &self.caller_id)
    }
}
