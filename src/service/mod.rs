//! Messaging service collaborator.
//!
//! The remote Pub/Sub service owns storage, delivery and redelivery. This
//! module only describes the RPC surface the CLI needs:
//! - `types` - Topic, subscription, message and IAM policy resources
//! - `names` - Short name to fully qualified resource path expansion
//! - `error` - Transport and API failures reported by the service
//! - `rest` - `reqwest` client for the v1 REST API (or a local emulator)

pub mod error;
pub mod names;
pub mod rest;
pub mod types;

pub use error::ServiceError;
pub use rest::RestClient;
pub use types::*;

use async_trait::async_trait;

/// Resource an IAM policy is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IamResource<'a> {
    Topic(&'a str),
    Subscription(&'a str),
}

impl IamResource<'_> {
    /// Fully qualified resource path within `project`.
    pub fn path(&self, project: &str) -> String {
        match self {
            IamResource::Topic(name) => names::topic_path(project, name),
            IamResource::Subscription(name) => names::subscription_path(project, name),
        }
    }
}

/// Asynchronous RPC surface of the hosted messaging service.
///
/// Topic and subscription arguments accept either short names (`greetings`)
/// or fully qualified paths (`projects/p/topics/greetings`). Every failure is
/// returned as-is; implementations do not retry.
#[async_trait]
pub trait MessagingService: Send + Sync {
    async fn create_topic(&self, topic: &str) -> Result<Topic, ServiceError>;

    async fn delete_topic(&self, topic: &str) -> Result<(), ServiceError>;

    async fn get_topic(&self, topic: &str) -> Result<Topic, ServiceError>;

    async fn list_topics(&self) -> Result<Vec<Topic>, ServiceError>;

    /// Publish a batch and return the service-assigned message ids, in order.
    async fn publish(
        &self,
        topic: &str,
        messages: Vec<PubsubMessage>,
    ) -> Result<Vec<String>, ServiceError>;

    async fn create_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, ServiceError>;

    async fn delete_subscription(&self, subscription: &str) -> Result<(), ServiceError>;

    async fn get_subscription(&self, subscription: &str) -> Result<Subscription, ServiceError>;

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, ServiceError>;

    /// Names of the subscriptions attached to `topic`.
    async fn list_topic_subscriptions(&self, topic: &str) -> Result<Vec<String>, ServiceError>;

    async fn pull(
        &self,
        subscription: &str,
        max_messages: u32,
    ) -> Result<Vec<ReceivedMessage>, ServiceError>;

    async fn acknowledge(&self, subscription: &str, ack_ids: &[String])
        -> Result<(), ServiceError>;

    async fn get_iam_policy(&self, resource: IamResource<'_>) -> Result<Policy, ServiceError>;

    async fn set_iam_policy(
        &self,
        resource: IamResource<'_>,
        policy: &Policy,
    ) -> Result<Policy, ServiceError>;

    /// Subset of `permissions` the caller holds on `resource`.
    async fn test_iam_permissions(
        &self,
        resource: IamResource<'_>,
        permissions: &[String],
    ) -> Result<Vec<String>, ServiceError>;
}
