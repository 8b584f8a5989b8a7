//! Common types used across CLI modules

use uuid::Uuid;

/// Job reference typed by the user: a full UUID or the start of one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdOrPrefix {
    Full(Uuid),
    /// Lowercased prefix that should match exactly one job
    Prefix(String),
}

impl IdOrPrefix {
    /// Parses a full UUID first, otherwise keeps the input as a prefix
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match Uuid::parse_str(input) {
            Ok(uuid) => IdOrPrefix::Full(uuid),
            Err(_) => IdOrPrefix::Prefix(input.to_lowercase()),
        }
    }
}

impl std::fmt::Display for IdOrPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdOrPrefix::Full(uuid) => write!(f, "{}", uuid),
            IdOrPrefix::Prefix(prefix) => write!(f, "{}", prefix),
        }
    }
}
