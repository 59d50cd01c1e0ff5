//! pubsub CLI - command-line surface over the messaging service.
//!
//! - `pubsub topics create|delete|list|get` - Topic administration
//! - `pubsub topics publish` - Publish a JSON message
//! - `pubsub topics publish-ordered` - Publish with a per-topic sequence number
//! - `pubsub subscriptions create|delete|list|get` - Subscription administration
//! - `pubsub subscriptions pull` - Pull and acknowledge messages
//! - `pubsub {topics,subscriptions} get-policy|set-policy|test-permissions` - IAM policy

mod args;
pub mod commands;

pub use args::{
    Cli, Commands, CreateSubscriptionArgs, GlobalArgs, ListSubscriptionsArgs, OutputFormat,
    PublishArgs, PublishOrderedArgs, PullArgs, SetPolicyArgs, SubscriptionAction,
    SubscriptionArg, SubscriptionsArgs, TestPermissionsArgs, TopicAction, TopicArg, TopicsArgs,
};
