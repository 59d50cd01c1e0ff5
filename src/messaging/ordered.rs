//! Ordered publication.
//!
//! The service does not guarantee delivery order, so each outgoing message
//! carries a `messageId` attribute holding a per-topic sequence number. The
//! number is claimed before the publish RPC is issued and is never handed
//! back: a failed publish leaves a gap, never a duplicate. Consumers reorder
//! by `messageId` and must tolerate gaps.
//!
//! Counters are keyed by the fully qualified topic path, so a short name and
//! its `projects/{p}/topics/{t}` form share one sequence.

use crate::messaging::payload::{encode_data, MessageDraft, ValidationError};
use crate::service::names::topic_path;
use crate::service::{MessagingService, PubsubMessage, ServiceError};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Attribute key carrying the sequence number.
pub const SEQUENCE_ATTRIBUTE: &str = "messageId";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("sequence for topic {0} is exhausted")]
    SequenceExhausted(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Per-topic sequence counters, owned by whoever builds the publisher.
///
/// Claims on one topic are serialized through that topic's atomic counter;
/// the map lock is only held to find or create the counter.
#[derive(Debug, Default)]
pub struct SequenceRegistry {
    counters: RwLock<HashMap<String, Arc<AtomicU64>>>,
}

impl SequenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next sequence number for `topic` (1 on first use).
    pub fn claim(&self, topic: &str) -> Option<u64> {
        let counter = self.counter(topic);
        counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_add(1)
            })
            .ok()
            .map(|previous| previous + 1)
    }

    /// Last claimed number for `topic`, 0 if none was claimed yet.
    pub fn current(&self, topic: &str) -> u64 {
        self.counters
            .read()
            .get(topic)
            .map(|counter| counter.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counters
            .read()
            .iter()
            .map(|(topic, counter)| (topic.clone(), counter.load(Ordering::Acquire)))
            .collect()
    }

    fn counter(&self, topic: &str) -> Arc<AtomicU64> {
        if let Some(counter) = self.counters.read().get(topic) {
            return Arc::clone(counter);
        }
        let mut counters = self.counters.write();
        Arc::clone(
            counters
                .entry(topic.to_string())
                .or_insert_with(|| Arc::new(AtomicU64::new(0))),
        )
    }
}

/// Outgoing payload of an ordered publish.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedMessage {
    pub data: Value,
    pub message_id: u64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl OrderedMessage {
    pub fn new(draft: MessageDraft, message_id: u64) -> Self {
        Self {
            data: draft.data,
            message_id,
            attributes: draft.attributes,
        }
    }

    pub fn to_pubsub_message(&self) -> PubsubMessage {
        let mut attributes = self.attributes.clone();
        attributes.insert(SEQUENCE_ATTRIBUTE.to_string(), self.message_id.to_string());
        PubsubMessage {
            data: encode_data(&self.data),
            attributes,
            ..Default::default()
        }
    }
}

/// Result of a successful ordered publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedReceipt {
    pub topic: String,
    pub sequence: u64,
    pub message_ids: Vec<String>,
    pub published: usize,
}

/// Assigns per-topic sequence numbers and publishes through `S`.
pub struct OrderedPublisher<S: ?Sized> {
    service: Arc<S>,
    registry: Arc<SequenceRegistry>,
    project: String,
}

impl<S: ?Sized> Clone for OrderedPublisher<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            registry: Arc::clone(&self.registry),
            project: self.project.clone(),
        }
    }
}

impl<S> OrderedPublisher<S>
where
    S: MessagingService + ?Sized,
{
    /// `project` qualifies short topic names before a number is claimed.
    pub fn new(
        service: Arc<S>,
        registry: Arc<SequenceRegistry>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            service,
            registry,
            project: project.into(),
        }
    }

    pub fn registry(&self) -> &Arc<SequenceRegistry> {
        &self.registry
    }

    /// Last number claimed for `topic_id` (short name or full path).
    pub fn current(&self, topic_id: &str) -> u64 {
        self.registry.current(&self.sequence_key(topic_id))
    }

    fn sequence_key(&self, topic_id: &str) -> String {
        topic_path(&self.project, topic_id)
    }

    /// Publish `message` (a JSON object with a `data` field) to `topic_id`.
    pub async fn publish_ordered(
        &self,
        topic_id: &str,
        message: Value,
    ) -> Result<OrderedReceipt, PublishError> {
        let draft = MessageDraft::from_value(message)?;
        self.publish_draft(topic_id, draft).await
    }

    pub async fn publish_draft(
        &self,
        topic_id: &str,
        draft: MessageDraft,
    ) -> Result<OrderedReceipt, PublishError> {
        if topic_id.trim().is_empty() {
            return Err(ValidationError::EmptyTopic.into());
        }
        if draft.attributes.contains_key(SEQUENCE_ATTRIBUTE) {
            let key = SEQUENCE_ATTRIBUTE.to_string();
            return Err(ValidationError::ReservedAttribute(key).into());
        }
        let sequence = self
            .registry
            .claim(&self.sequence_key(topic_id))
            .ok_or_else(|| PublishError::SequenceExhausted(topic_id.to_string()))?;
        tracing::debug!(topic = topic_id, sequence, "claimed ordered sequence");

        let outgoing = OrderedMessage::new(draft, sequence).to_pubsub_message();
        let message_ids = self
            .service
            .publish(topic_id, vec![outgoing])
            .await
            .map_err(|err| {
                tracing::warn!(topic = topic_id, sequence, "ordered publish failed: {err}");
                err
            })?;

        Ok(OrderedReceipt {
            topic: topic_id.to_string(),
            sequence,
            published: message_ids.len(),
            message_ids,
        })
    }
}
