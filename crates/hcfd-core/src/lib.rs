//! Core data types, error taxonomy and pipeline seams for the HCFD alert poller
//!
//! This crate holds the shared domain model: typed feed readings, change
//! tokens, and the traits the poll cycle is wired through (telemetry,
//! set store, messaging gateway, clock).

pub mod errors;
pub mod pipeline;
pub mod types;

pub use errors::*;
pub use pipeline::*;
pub use types::*;
