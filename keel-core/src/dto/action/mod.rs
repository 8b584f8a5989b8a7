//! Action log DTOs

use serde::{Deserialize, Serialize};

use crate::domain::action::ActionKind;

/// Request to append an entry to a job's action log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendAction {
    pub kind: ActionKind,
    pub message: String,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

/// Body of an append request: one entry or a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionBatch {
    One(AppendAction),
    Many(Vec<AppendAction>),
}

impl ActionBatch {
    pub fn into_entries(self) -> Vec<AppendAction> {
        match self {
            ActionBatch::One(entry) => vec![entry],
            ActionBatch::Many(entries) => entries,
        }
    }
}
