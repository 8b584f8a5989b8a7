//! Service Module
//!
//! Business logic layer of the engine.
//! The coordinator is the single entry point; executor reports and system
//! cancellations are further operations on the same type.

pub mod coordinator;
pub mod executor;
pub mod listener;

// Re-export for convenience
pub use coordinator::{Admitted, Coordinator};
pub use listener::spawn_revocation_listener;
