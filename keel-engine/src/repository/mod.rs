//! Repository Module
//!
//! Data access layer for the engine. Each repository is a trait with an
//! in-memory implementation and a SQLite-backed one, so the engine runs the
//! same way with or without a disk-backed store.

pub mod action;
pub mod job;
mod locks;

// Re-export for convenience
pub use action::{ActionLog, MemoryActionLog, SqliteActionLog};
pub use job::{JobStore, MemoryJobStore, Mutator, Settle, SqliteJobStore};
