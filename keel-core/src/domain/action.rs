//! Action log domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A reasoning or decision entry recorded against a job
///
/// Entries are append-only and never change after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLogEntry {
    pub job_id: Uuid,
    /// Insertion order; increases across appends
    pub seq: u64,
    pub kind: ActionKind,
    pub message: String,
    pub detail: Option<serde_json::Value>,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Reasoning,
    Decision,
    Action,
    Observation,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Reasoning => "reasoning",
            ActionKind::Decision => "decision",
            ActionKind::Action => "action",
            ActionKind::Observation => "observation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reasoning" => Some(ActionKind::Reasoning),
            "decision" => Some(ActionKind::Decision),
            "action" => Some(ActionKind::Action),
            "observation" => Some(ActionKind::Observation),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
