//! Operational plumbing.
//!
//! - `telemetry` - Tracing subscriber installation

pub mod telemetry;

pub use telemetry::*;
