//! pubsub - unified CLI entrypoint.
//!
//! Usage:
//!   pubsub topics create greetings
//!   pubsub topics publish-ordered greetings '{"data":"Hello, world!"}'
//!   pubsub subscriptions create greetings worker
//!   pubsub subscriptions pull worker --max-messages 5

use anyhow::Result;
use clap::Parser;
use pubsubctl::cli::commands::{resolve_config, run_subscriptions, run_topics, CommandContext};
use pubsubctl::cli::{Cli, Commands};
use pubsubctl::telemetry::{init_tracing, log_filter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = resolve_config(&cli.global)?;
    init_tracing(
        log_filter(cli.global.log_level.as_deref(), &cfg.logging.level),
        cli.global.log_json || cfg.logging.json,
    )?;
    let ctx = CommandContext::from_config(&cfg, cli.global.format)?;
    let mut stdout = std::io::stdout();

    match cli.command {
        Commands::Topics(args) => run_topics(args, &ctx, &mut stdout).await,
        Commands::Subscriptions(args) => run_subscriptions(args, &ctx, &mut stdout).await,
    }
}
