//! # Taskyard Core
//!
//! Shared error definitions and telemetry setup used by every Taskyard crate.

pub mod error;
pub mod telemetry;

pub use error::*;
pub use telemetry::{init_telemetry, LogFormat, TelemetryConfig};

// Re-export shaku for dependency injection
pub use shaku::Interface;
