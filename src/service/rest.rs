//! HTTP client for the v1 REST surface.
//!
//! Speaks JSON to `{endpoint}/v1/{resource}` and maps error bodies of the
//! form `{"error": {"code": .., "status": .., "message": ..}}` onto
//! [`ServiceError`]. No request is retried.

use crate::config::ClientConfig;
use crate::service::names::{project_path, subscription_path, topic_path};
use crate::service::{
    IamResource, MessagingService, Policy, PubsubMessage, ReceivedMessage, ServiceError,
    Subscription, Topic,
};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `reqwest`-backed [`MessagingService`].
#[derive(Clone)]
pub struct RestClient {
    base: String,
    project: String,
    access_token: Option<String>,
    http: reqwest::Client,
}

impl RestClient {
    pub fn from_config(cfg: &ClientConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .user_agent(concat!("pubsubctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ServiceError::transport)?;
        Ok(Self {
            base: cfg.endpoint.trim_end_matches('/').to_string(),
            project: cfg.project_id.clone(),
            access_token: cfg.access_token.clone(),
            http,
        })
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        resource: &str,
    ) -> Result<T, ServiceError> {
        let response = builder.send().await.map_err(|err| {
            tracing::debug!(resource, "request failed: {err}");
            ServiceError::transport(err)
        })?;
        let status = response.status();
        let body = response.text().await.map_err(ServiceError::transport)?;
        if !status.is_success() {
            return Err(error_from_body(status, resource, &body));
        }
        let body = if body.trim().is_empty() { "{}" } else { &body };
        serde_json::from_str(body).map_err(|err| ServiceError::Decode(err.to_string()))
    }

    /// Follow `nextPageToken` until the listing is exhausted.
    async fn list_paged<P: Page>(&self, path: &str) -> Result<Vec<P::Item>, ServiceError> {
        let mut items = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut builder = self.request(Method::GET, path);
            if let Some(token) = &token {
                builder = builder.query(&[("pageToken", token.as_str())]);
            }
            let page: P = self.send(builder, path).await?;
            let (mut chunk, next) = page.into_parts();
            items.append(&mut chunk);
            match next {
                Some(next) if !next.is_empty() => token = Some(next),
                _ => break,
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl MessagingService for RestClient {
    async fn create_topic(&self, topic: &str) -> Result<Topic, ServiceError> {
        let path = topic_path(&self.project, topic);
        let builder = self
            .request(Method::PUT, &path)
            .json(&serde_json::json!({}));
        self.send(builder, &path).await
    }

    async fn delete_topic(&self, topic: &str) -> Result<(), ServiceError> {
        let path = topic_path(&self.project, topic);
        let _: Empty = self.send(self.request(Method::DELETE, &path), &path).await?;
        Ok(())
    }

    async fn get_topic(&self, topic: &str) -> Result<Topic, ServiceError> {
        let path = topic_path(&self.project, topic);
        self.send(self.request(Method::GET, &path), &path).await
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, ServiceError> {
        let path = format!("{}/topics", project_path(&self.project));
        self.list_paged::<ListTopicsResponse>(&path).await
    }

    async fn publish(
        &self,
        topic: &str,
        messages: Vec<PubsubMessage>,
    ) -> Result<Vec<String>, ServiceError> {
        let path = topic_path(&self.project, topic);
        let builder = self
            .request(Method::POST, &format!("{path}:publish"))
            .json(&PublishRequest { messages });
        let response: PublishResponse = self.send(builder, &path).await?;
        Ok(response.message_ids)
    }

    async fn create_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, ServiceError> {
        let path = subscription_path(&self.project, &subscription.name);
        let mut body = subscription.clone();
        body.name = path.clone();
        body.topic = topic_path(&self.project, &subscription.topic);
        let builder = self.request(Method::PUT, &path).json(&body);
        self.send(builder, &path).await
    }

    async fn delete_subscription(&self, subscription: &str) -> Result<(), ServiceError> {
        let path = subscription_path(&self.project, subscription);
        let _: Empty = self.send(self.request(Method::DELETE, &path), &path).await?;
        Ok(())
    }

    async fn get_subscription(&self, subscription: &str) -> Result<Subscription, ServiceError> {
        let path = subscription_path(&self.project, subscription);
        self.send(self.request(Method::GET, &path), &path).await
    }

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, ServiceError> {
        let path = format!("{}/subscriptions", project_path(&self.project));
        self.list_paged::<ListSubscriptionsResponse>(&path).await
    }

    async fn list_topic_subscriptions(&self, topic: &str) -> Result<Vec<String>, ServiceError> {
        let path = format!("{}/subscriptions", topic_path(&self.project, topic));
        self.list_paged::<ListTopicSubscriptionsResponse>(&path)
            .await
    }

    async fn pull(
        &self,
        subscription: &str,
        max_messages: u32,
    ) -> Result<Vec<ReceivedMessage>, ServiceError> {
        let path = subscription_path(&self.project, subscription);
        let builder = self
            .request(Method::POST, &format!("{path}:pull"))
            .json(&PullRequest { max_messages });
        let response: PullResponse = self.send(builder, &path).await?;
        Ok(response.received_messages)
    }

    async fn acknowledge(
        &self,
        subscription: &str,
        ack_ids: &[String],
    ) -> Result<(), ServiceError> {
        if ack_ids.is_empty() {
            return Ok(());
        }
        let path = subscription_path(&self.project, subscription);
        let builder = self
            .request(Method::POST, &format!("{path}:acknowledge"))
            .json(&AcknowledgeRequest { ack_ids });
        let _: Empty = self.send(builder, &path).await?;
        Ok(())
    }

    async fn get_iam_policy(&self, resource: IamResource<'_>) -> Result<Policy, ServiceError> {
        let path = resource.path(&self.project);
        let builder = self.request(Method::GET, &format!("{path}:getIamPolicy"));
        self.send(builder, &path).await
    }

    async fn set_iam_policy(
        &self,
        resource: IamResource<'_>,
        policy: &Policy,
    ) -> Result<Policy, ServiceError> {
        let path = resource.path(&self.project);
        let builder = self
            .request(Method::POST, &format!("{path}:setIamPolicy"))
            .json(&SetIamPolicyRequest { policy });
        self.send(builder, &path).await
    }

    async fn test_iam_permissions(
        &self,
        resource: IamResource<'_>,
        permissions: &[String],
    ) -> Result<Vec<String>, ServiceError> {
        let path = resource.path(&self.project);
        let builder = self
            .request(Method::POST, &format!("{path}:testIamPermissions"))
            .json(&TestIamPermissionsBody { permissions });
        let response: TestIamPermissionsResponse = self.send(builder, &path).await?;
        Ok(response.permissions)
    }
}

fn error_from_body(status: StatusCode, resource: &str, body: &str) -> ServiceError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error);
    let message = detail
        .as_ref()
        .map(|d| d.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| truncate(body.trim(), 200));
    if status == StatusCode::NOT_FOUND {
        return ServiceError::not_found(resource, message);
    }
    let status_name = detail
        .map(|d| d.status)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("UNKNOWN")
                .to_uppercase()
                .replace(' ', "_")
        });
    ServiceError::Api {
        code: status.as_u16(),
        status: status_name,
        message,
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut end = max_len;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

trait Page: DeserializeOwned {
    type Item;
    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

#[derive(Deserialize)]
struct Empty {}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

#[derive(Serialize)]
struct PublishRequest {
    messages: Vec<PubsubMessage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PullRequest {
    max_messages: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullResponse {
    #[serde(default)]
    received_messages: Vec<ReceivedMessage>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AcknowledgeRequest<'a> {
    ack_ids: &'a [String],
}

#[derive(Serialize)]
struct SetIamPolicyRequest<'a> {
    policy: &'a Policy,
}

#[derive(Serialize)]
struct TestIamPermissionsBody<'a> {
    permissions: &'a [String],
}

#[derive(Deserialize)]
struct TestIamPermissionsResponse {
    #[serde(default)]
    permissions: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListTopicsResponse {
    #[serde(default)]
    topics: Vec<Topic>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl Page for ListTopicsResponse {
    type Item = Topic;
    fn into_parts(self) -> (Vec<Topic>, Option<String>) {
        (self.topics, self.next_page_token)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListSubscriptionsResponse {
    #[serde(default)]
    subscriptions: Vec<Subscription>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl Page for ListSubscriptionsResponse {
    type Item = Subscription;
    fn into_parts(self) -> (Vec<Subscription>, Option<String>) {
        (self.subscriptions, self.next_page_token)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListTopicSubscriptionsResponse {
    #[serde(default)]
    subscriptions: Vec<String>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl Page for ListTopicSubscriptionsResponse {
    type Item = String;
    fn into_parts(self) -> (Vec<String>, Option<String>) {
        (self.subscriptions, self.next_page_token)
    }
}
