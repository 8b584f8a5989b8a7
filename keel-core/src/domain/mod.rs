//! Core domain types
//!
//! This module contains the core domain structures used across Keel crates.
//! These types are shared between the engine (for persistence) and clients
//! (for display and executor reporting).

pub mod action;
pub mod checkpoint;
pub mod job;
