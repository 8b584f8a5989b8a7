//! Keel Core
//!
//! Core types and abstractions for the Keel job engine.
//!
//! This crate contains:
//! - Domain types: job records, checkpoints, action log entries
//! - DTOs: request/response bodies exchanged with the engine API
//! - The job state machine (pure transition function and guards)

mod blob;
pub mod domain;
pub mod dto;
pub mod machine;
