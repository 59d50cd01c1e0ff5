#![warn(unused, dead_code)]
#![deny(clippy::all, clippy::pedantic)]
// Module naming: common pattern in domain-driven code
#![allow(clippy::module_name_repetitions)]
// Documentation style: many terms don't need backticks
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
// API ergonomics: prefer simplicity over must_use annotations
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
// Format strings: allow non-inlined for readability
#![allow(clippy::uninlined_format_args)]
// Passing style
#![allow(clippy::needless_pass_by_value)]
// Numeric casts: counts are small
#![allow(clippy::cast_possible_truncation)]
// Option/Result patterns
#![allow(clippy::option_if_let_else)]
#![allow(clippy::map_unwrap_or)]
// Large types
#![allow(clippy::large_futures)]
// Error handling style
#![allow(clippy::result_large_err)]

//! pubsubctl - command-line client for a hosted publish/subscribe service.
//!
//! # Module Organization
//!
//! ## Core
//! - `core::config` - Configuration loading, environment overrides and validation
//!
//! ## Service
//! - `service` - `MessagingService` trait, wire resources and errors
//! - `service::rest` - REST client for the v1 API (or a local emulator)
//!
//! ## Messaging
//! - `messaging::payload` - JSON message parsing and validation
//! - `messaging::ordered` - Per-topic sequence registry and ordered publisher
//!
//! ## Operations
//! - `ops::telemetry` - Tracing subscriber installation
//!
//! ## CLI
//! - `cli` - clap argument definitions and command implementations

// Core infrastructure
pub mod core;

// Messaging service collaborator
pub mod service;

// Message construction and ordered publication
pub mod messaging;

// Operations
pub mod ops;

// CLI
pub mod cli;

// Re-exports for convenience
pub use self::core::config;
pub use messaging::{OrderedPublisher, PublishError, SequenceRegistry};
pub use ops::telemetry;
pub use service::{MessagingService, RestClient, ServiceError};
