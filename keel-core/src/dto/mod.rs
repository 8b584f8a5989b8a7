//! Data Transfer Objects for the engine API
//!
//! Request and response bodies exchanged between the engine, the UI, CLI
//! tooling and external executors.

pub mod action;
pub mod governor;
pub mod job;
