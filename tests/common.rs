//! Common test harness utilities for integration tests.
//!
//! This module provides helpers for:
//! - An in-memory `MessagingService` with failure injection
//! - Mounting canned JSON responses on a `wiremock` server
//! - Building client configurations pointed at that server

// Not all test files use all helpers; silence dead_code warnings for unused exports.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use pubsubctl::config::ClientConfig;
use pubsubctl::service::names::{subscription_path, topic_path};
use pubsubctl::service::{
    IamResource, MessagingService, Policy, PubsubMessage, ReceivedMessage, ServiceError,
    Subscription, Topic,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const PROJECT: &str = "test-project";

// =============================================================================
// In-memory messaging service
// =============================================================================

#[derive(Default)]
struct MemoryState {
    topics: BTreeMap<String, Topic>,
    subscriptions: BTreeMap<String, Subscription>,
    backlog: HashMap<String, VecDeque<ReceivedMessage>>,
    policies: HashMap<String, Policy>,
    published: Vec<(String, PubsubMessage)>,
    acked: Vec<String>,
    publish_failures: VecDeque<ServiceError>,
    delayed_failure: Option<(usize, ServiceError)>,
    denied_permissions: Vec<String>,
}

/// In-memory stand-in for the hosted service.
///
/// Publishes record every message (in arrival order) and fan out to the
/// subscriptions of the topic. Failures queued with [`fail_next_publish`]
/// are returned by subsequent publishes before any state changes.
///
/// [`fail_next_publish`]: MemoryService::fail_next_publish
pub struct MemoryService {
    state: Mutex<MemoryState>,
    next_id: AtomicU64,
    yield_on_publish: bool,
}

impl MemoryService {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            next_id: AtomicU64::new(1000),
            yield_on_publish: false,
        }
    }

    /// Yield to the scheduler inside `publish` so concurrent callers interleave.
    pub fn interleaving() -> Self {
        Self {
            yield_on_publish: true,
            ..Self::new()
        }
    }

    /// Create topics up front (short names).
    pub fn with_topics(self, topics: &[&str]) -> Self {
        {
            let mut state = self.state.lock();
            for topic in topics {
                let path = topic_path(PROJECT, topic);
                state.topics.insert(path.clone(), Topic::new(path));
            }
        }
        self
    }

    pub fn fail_next_publish(&self, err: ServiceError) {
        self.state.lock().publish_failures.push_back(err);
    }

    /// Let `successes` publishes through, then fail the next one with `err`.
    pub fn fail_publish_after(&self, successes: usize, err: ServiceError) {
        self.state.lock().delayed_failure = Some((successes, err));
    }

    pub fn deny_permission(&self, permission: &str) {
        self.state
            .lock()
            .denied_permissions
            .push(permission.to_string());
    }

    /// Messages published to `topic`, in the order the service received them.
    pub fn published(&self, topic: &str) -> Vec<PubsubMessage> {
        let path = topic_path(PROJECT, topic);
        self.state
            .lock()
            .published
            .iter()
            .filter(|(t, _)| *t == path)
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    /// `messageId` attributes published to `topic`, parsed as numbers.
    pub fn sequence_ids(&self, topic: &str) -> Vec<u64> {
        self.published(topic)
            .iter()
            .map(|msg| {
                msg.attributes
                    .get("messageId")
                    .expect("ordered message carries messageId")
                    .parse()
                    .expect("numeric messageId")
            })
            .collect()
    }

    pub fn acked(&self) -> Vec<String> {
        self.state.lock().acked.clone()
    }

    pub fn backlog_len(&self, subscription: &str) -> usize {
        let path = subscription_path(PROJECT, subscription);
        self.state
            .lock()
            .backlog
            .get(&path)
            .map_or(0, VecDeque::len)
    }

    fn topic_missing(path: &str) -> ServiceError {
        ServiceError::not_found(path, "Resource not found (resource=topic).")
    }

    fn subscription_missing(path: &str) -> ServiceError {
        ServiceError::not_found(path, "Resource not found (resource=subscription).")
    }

    fn already_exists(path: &str) -> ServiceError {
        ServiceError::Api {
            code: 409,
            status: "ALREADY_EXISTS".into(),
            message: format!("Resource already exists in the project (resource={path})."),
        }
    }
}

impl Default for MemoryService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagingService for MemoryService {
    async fn create_topic(&self, topic: &str) -> Result<Topic, ServiceError> {
        let path = topic_path(PROJECT, topic);
        let mut state = self.state.lock();
        if state.topics.contains_key(&path) {
            return Err(Self::already_exists(&path));
        }
        let created = Topic::new(path.clone());
        state.topics.insert(path, created.clone());
        Ok(created)
    }

    async fn delete_topic(&self, topic: &str) -> Result<(), ServiceError> {
        let path = topic_path(PROJECT, topic);
        self.state
            .lock()
            .topics
            .remove(&path)
            .map(|_| ())
            .ok_or_else(|| Self::topic_missing(&path))
    }

    async fn get_topic(&self, topic: &str) -> Result<Topic, ServiceError> {
        let path = topic_path(PROJECT, topic);
        self.state
            .lock()
            .topics
            .get(&path)
            .cloned()
            .ok_or_else(|| Self::topic_missing(&path))
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, ServiceError> {
        Ok(self.state.lock().topics.values().cloned().collect())
    }

    async fn publish(
        &self,
        topic: &str,
        messages: Vec<PubsubMessage>,
    ) -> Result<Vec<String>, ServiceError> {
        if self.yield_on_publish {
            tokio::task::yield_now().await;
        }
        let path = topic_path(PROJECT, topic);
        let mut state = self.state.lock();
        if let Some(err) = state.publish_failures.pop_front() {
            return Err(err);
        }
        match state.delayed_failure.take() {
            Some((0, err)) => return Err(err),
            Some((remaining, err)) => state.delayed_failure = Some((remaining - 1, err)),
            None => {}
        }
        if !state.topics.contains_key(&path) {
            return Err(Self::topic_missing(&path));
        }
        let attached: Vec<String> = state
            .subscriptions
            .values()
            .filter(|sub| sub.topic == path)
            .map(|sub| sub.name.clone())
            .collect();
        let mut ids = Vec::with_capacity(messages.len());
        for mut message in messages {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
            message.message_id = Some(id.clone());
            for sub in &attached {
                state
                    .backlog
                    .entry(sub.clone())
                    .or_default()
                    .push_back(ReceivedMessage {
                        ack_id: format!("ack-{id}-{}", common_short(sub)),
                        message: message.clone(),
                        delivery_attempt: None,
                    });
            }
            state.published.push((path.clone(), message));
            ids.push(id);
        }
        Ok(ids)
    }

    async fn create_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, ServiceError> {
        let path = subscription_path(PROJECT, &subscription.name);
        let topic = topic_path(PROJECT, &subscription.topic);
        let mut state = self.state.lock();
        if !state.topics.contains_key(&topic) {
            return Err(Self::topic_missing(&topic));
        }
        if state.subscriptions.contains_key(&path) {
            return Err(Self::already_exists(&path));
        }
        let mut created = subscription.clone();
        created.name = path.clone();
        created.topic = topic;
        created.ack_deadline_seconds = created.ack_deadline_seconds.or(Some(10));
        state.subscriptions.insert(path, created.clone());
        Ok(created)
    }

    async fn delete_subscription(&self, subscription: &str) -> Result<(), ServiceError> {
        let path = subscription_path(PROJECT, subscription);
        let mut state = self.state.lock();
        state.backlog.remove(&path);
        state
            .subscriptions
            .remove(&path)
            .map(|_| ())
            .ok_or_else(|| Self::subscription_missing(&path))
    }

    async fn get_subscription(&self, subscription: &str) -> Result<Subscription, ServiceError> {
        let path = subscription_path(PROJECT, subscription);
        self.state
            .lock()
            .subscriptions
            .get(&path)
            .cloned()
            .ok_or_else(|| Self::subscription_missing(&path))
    }

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, ServiceError> {
        Ok(self.state.lock().subscriptions.values().cloned().collect())
    }

    async fn list_topic_subscriptions(&self, topic: &str) -> Result<Vec<String>, ServiceError> {
        let path = topic_path(PROJECT, topic);
        let state = self.state.lock();
        if !state.topics.contains_key(&path) {
            return Err(Self::topic_missing(&path));
        }
        Ok(state
            .subscriptions
            .values()
            .filter(|sub| sub.topic == path)
            .map(|sub| sub.name.clone())
            .collect())
    }

    async fn pull(
        &self,
        subscription: &str,
        max_messages: u32,
    ) -> Result<Vec<ReceivedMessage>, ServiceError> {
        let path = subscription_path(PROJECT, subscription);
        let state = self.state.lock();
        if !state.subscriptions.contains_key(&path) {
            return Err(Self::subscription_missing(&path));
        }
        Ok(state
            .backlog
            .get(&path)
            .map(|queue| queue.iter().take(max_messages as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn acknowledge(
        &self,
        subscription: &str,
        ack_ids: &[String],
    ) -> Result<(), ServiceError> {
        let path = subscription_path(PROJECT, subscription);
        let mut state = self.state.lock();
        if !state.subscriptions.contains_key(&path) {
            return Err(Self::subscription_missing(&path));
        }
        if let Some(queue) = state.backlog.get_mut(&path) {
            queue.retain(|received| !ack_ids.contains(&received.ack_id));
        }
        state.acked.extend(ack_ids.iter().cloned());
        Ok(())
    }

    async fn get_iam_policy(&self, resource: IamResource<'_>) -> Result<Policy, ServiceError> {
        let path = resource.path(PROJECT);
        Ok(self
            .state
            .lock()
            .policies
            .get(&path)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_iam_policy(
        &self,
        resource: IamResource<'_>,
        policy: &Policy,
    ) -> Result<Policy, ServiceError> {
        let path = resource.path(PROJECT);
        let mut stored = policy.clone();
        stored.version = Some(1);
        stored.etag = Some("BwYAAAAAAAA=".into());
        self.state.lock().policies.insert(path, stored.clone());
        Ok(stored)
    }

    async fn test_iam_permissions(
        &self,
        _resource: IamResource<'_>,
        permissions: &[String],
    ) -> Result<Vec<String>, ServiceError> {
        let state = self.state.lock();
        Ok(permissions
            .iter()
            .filter(|p| !state.denied_permissions.contains(p))
            .cloned()
            .collect())
    }
}

fn common_short(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

// =============================================================================
// HTTP mock helpers
// =============================================================================

/// Start a mock HTTP backend. Unmatched requests answer 404.
pub async fn mock_server() -> MockServer {
    MockServer::start().await
}

/// Client configuration pointed at `server`, without credentials.
pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig {
        project_id: PROJECT.into(),
        endpoint: server.uri(),
        request_timeout_ms: 5_000,
        ..Default::default()
    }
}

/// Answer `verb route` with a JSON `body`.
pub async fn respond(server: &MockServer, verb: &str, route: &str, status: u16, body: &str) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(json_response(status, body))
        .mount(server)
        .await;
}

pub fn json_response(status: u16, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_raw(body.to_string(), "application/json")
}

pub async fn requests(server: &MockServer) -> Vec<Request> {
    server.received_requests().await.unwrap_or_default()
}

pub async fn last_request(server: &MockServer) -> Request {
    requests(server).await.pop().expect("at least one request")
}

pub fn body_json(request: &Request) -> serde_json::Value {
    request.body_json().expect("request body is JSON")
}
