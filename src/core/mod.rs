//! Core client infrastructure.
//!
//! - `config` - Configuration loading, environment overrides and validation

pub mod config;

pub use config::*;
