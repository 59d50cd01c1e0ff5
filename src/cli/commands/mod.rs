//! CLI command implementations.

mod output;
mod policy;
mod subscriptions;
mod topics;

pub use output::Output;
pub use subscriptions::run_subscriptions;
pub use topics::run_topics;

use crate::cli::args::{GlobalArgs, OutputFormat};
use crate::config::{ClientConfig, PullConfig};
use crate::messaging::{OrderedPublisher, SequenceRegistry};
use crate::service::{MessagingService, RestClient};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Everything a command needs to talk to the service and render results.
pub struct CommandContext {
    pub project: String,
    pub service: Arc<dyn MessagingService>,
    pub publisher: OrderedPublisher<dyn MessagingService>,
    pub pull: PullConfig,
    pub format: OutputFormat,
}

impl CommandContext {
    pub fn new(
        project: impl Into<String>,
        service: Arc<dyn MessagingService>,
        pull: PullConfig,
        format: OutputFormat,
    ) -> Self {
        let project: String = project.into();
        let registry = Arc::new(SequenceRegistry::new());
        let publisher = OrderedPublisher::new(Arc::clone(&service), registry, project.clone());
        Self {
            project,
            service,
            publisher,
            pull,
            format,
        }
    }

    /// Build a context backed by the REST client described by `cfg`.
    pub fn from_config(cfg: &ClientConfig, format: OutputFormat) -> Result<Self> {
        let client = RestClient::from_config(cfg).context("build service client")?;
        Ok(Self::new(
            cfg.project_id.clone(),
            Arc::new(client),
            cfg.pull.clone(),
            format,
        ))
    }
}

/// Resolve configuration from file, environment and command-line flags.
pub fn resolve_config(global: &GlobalArgs) -> Result<ClientConfig> {
    let mut cfg = ClientConfig::resolve(global.config.as_deref())?;
    if let Some(project) = &global.project {
        cfg.project_id = project.clone();
    }
    if let Some(endpoint) = &global.endpoint {
        cfg.endpoint = endpoint.trim_end_matches('/').to_string();
    }
    cfg.validate()?;
    Ok(cfg)
}
