//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// pubsub - command-line client for a hosted publish/subscribe service.
#[derive(Parser)]
#[command(name = "pubsub")]
#[command(version)]
#[command(about = "Manage topics, subscriptions and messages on a Pub/Sub service")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection and presentation options accepted by every command.
#[derive(Args, Clone)]
pub struct GlobalArgs {
    /// Path to a TOML or JSON configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Project that owns the topics and subscriptions
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// Service endpoint, e.g. http://localhost:8085 for an emulator
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Output format for command results
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Log filter (e.g. debug, pubsubctl=trace); overrides RUST_LOG
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Output format for command results.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable confirmation lines
    #[default]
    Text,
    /// Pretty-printed JSON documents
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage topics and publish messages
    #[command(alias = "topic")]
    Topics(TopicsArgs),

    /// Manage subscriptions and pull messages
    #[command(alias = "subscription")]
    Subscriptions(SubscriptionsArgs),
}

// -----------------------------------------------------------------------------
// Topic commands
// -----------------------------------------------------------------------------

#[derive(Args)]
pub struct TopicsArgs {
    #[command(subcommand)]
    pub action: TopicAction,
}

#[derive(Subcommand)]
pub enum TopicAction {
    /// Create a topic
    Create(TopicArg),

    /// Delete a topic
    Delete(TopicArg),

    /// List topics in the project
    List,

    /// Show a topic
    Get(TopicArg),

    /// Publish a JSON message to a topic
    Publish(PublishArgs),

    /// Publish a JSON message tagged with a per-topic sequence number
    #[command(alias = "publishOrdered")]
    PublishOrdered(PublishOrderedArgs),

    /// Show the IAM policy of a topic
    #[command(alias = "getPolicy")]
    GetPolicy(TopicArg),

    /// Replace the IAM policy of a topic
    #[command(alias = "setPolicy")]
    SetPolicy(SetPolicyArgs),

    /// Check which permissions the caller holds on a topic
    #[command(alias = "testPermissions")]
    TestPermissions(TestPermissionsArgs),
}

#[derive(Args)]
pub struct TopicArg {
    /// Topic name or full resource path
    pub topic: String,
}

#[derive(Args)]
pub struct PublishArgs {
    /// Topic name or full resource path
    pub topic: String,

    /// JSON message; an object with "data" (and optional "attributes") or any JSON value
    pub message: String,

    /// Extra message attribute (can be repeated)
    #[arg(long = "attribute", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub attributes: Vec<(String, String)>,
}

#[derive(Args)]
pub struct PublishOrderedArgs {
    /// Topic name or full resource path
    pub topic: String,

    /// JSON object with a "data" field
    pub message: String,

    /// Number of ordered publishes to issue in this process
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub count: u32,
}

// -----------------------------------------------------------------------------
// Subscription commands
// -----------------------------------------------------------------------------

#[derive(Args)]
pub struct SubscriptionsArgs {
    #[command(subcommand)]
    pub action: SubscriptionAction,
}

#[derive(Subcommand)]
pub enum SubscriptionAction {
    /// Create a subscription on a topic
    Create(CreateSubscriptionArgs),

    /// Delete a subscription
    Delete(SubscriptionArg),

    /// List subscriptions in the project, or of one topic
    List(ListSubscriptionsArgs),

    /// Show a subscription
    Get(SubscriptionArg),

    /// Pull pending messages and acknowledge them
    Pull(PullArgs),

    /// Show the IAM policy of a subscription
    #[command(alias = "getPolicy")]
    GetPolicy(SubscriptionArg),

    /// Replace the IAM policy of a subscription
    #[command(alias = "setPolicy")]
    SetPolicy(SetPolicyArgs),

    /// Check which permissions the caller holds on a subscription
    #[command(alias = "testPermissions")]
    TestPermissions(TestPermissionsArgs),
}

#[derive(Args)]
pub struct SubscriptionArg {
    /// Subscription name or full resource path
    pub subscription: String,
}

#[derive(Args)]
pub struct CreateSubscriptionArgs {
    /// Topic to attach the subscription to
    pub topic: String,

    /// Subscription name or full resource path
    pub subscription: String,

    /// Seconds the service waits for an ack before redelivering
    #[arg(long, value_parser = clap::value_parser!(u32).range(10..=600))]
    pub ack_deadline: Option<u32>,

    /// Deliver by HTTPS push to this endpoint instead of pull
    #[arg(long, value_name = "URL")]
    pub push_endpoint: Option<String>,
}

#[derive(Args)]
pub struct ListSubscriptionsArgs {
    /// Only list subscriptions attached to this topic
    pub topic: Option<String>,
}

#[derive(Args)]
pub struct PullArgs {
    /// Subscription name or full resource path
    pub subscription: String,

    /// Maximum number of messages to return (defaults to pull.max_messages)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub max_messages: Option<u32>,

    /// Leave pulled messages unacknowledged so they are redelivered
    #[arg(long)]
    pub no_ack: bool,
}

// -----------------------------------------------------------------------------
// IAM policy commands (shared by topics and subscriptions)
// -----------------------------------------------------------------------------

#[derive(Args)]
pub struct SetPolicyArgs {
    /// Topic or subscription name
    pub name: String,

    /// Role binding to grant (can be repeated)
    #[arg(
        long = "binding",
        value_name = "ROLE=MEMBER",
        value_parser = parse_binding,
        required = true
    )]
    pub bindings: Vec<(String, String)>,
}

#[derive(Args)]
pub struct TestPermissionsArgs {
    /// Topic or subscription name
    pub name: String,

    /// Permission to test (can be repeated; defaults depend on the resource)
    #[arg(long = "permission", value_name = "PERMISSION")]
    pub permissions: Vec<String>,
}

/// Parse a key=value argument into a tuple.
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| "expected KEY=VALUE".to_string())?;
    if key.is_empty() {
        return Err("attribute key may not be empty".into());
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parse a ROLE=MEMBER binding; bare role ids get the `roles/` prefix.
fn parse_binding(s: &str) -> Result<(String, String), String> {
    let (role, member) = s
        .split_once('=')
        .ok_or_else(|| "expected ROLE=MEMBER".to_string())?;
    if role.is_empty() || member.is_empty() {
        return Err("role and member may not be empty".into());
    }
    let role = if role.starts_with("roles/") {
        role.to_string()
    } else {
        format!("roles/{role}")
    };
    Ok((role, member.to_string()))
}
