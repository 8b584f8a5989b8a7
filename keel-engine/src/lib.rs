//! Keel engine
//!
//! Tracks background jobs through their lifecycle, keeps their checkpoints,
//! and governs how many of them execute at once. Execution itself happens
//! elsewhere; the engine only records state and signals cancellation.

pub mod api;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod governor;
pub mod repository;
pub mod service;
