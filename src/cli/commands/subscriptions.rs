//! Subscription commands.

use super::policy::{self, SUBSCRIPTION_PERMISSIONS};
use super::{CommandContext, Output};
use crate::cli::args::{CreateSubscriptionArgs, PullArgs, SubscriptionAction, SubscriptionsArgs};
use crate::service::names::subscription_path;
use crate::service::{IamResource, ReceivedMessage, Subscription};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct Deleted<'a> {
    deleted: &'a str,
}

#[derive(Serialize)]
struct PullReport<'a> {
    subscription: &'a str,
    messages: &'a [ReceivedMessage],
    acknowledged: usize,
}

pub async fn run_subscriptions(
    args: SubscriptionsArgs,
    ctx: &CommandContext,
    out: &mut dyn Write,
) -> Result<()> {
    let mut out = Output::new(ctx.format, out);
    match args.action {
        SubscriptionAction::Create(create_args) => create(ctx, create_args, &mut out).await,
        SubscriptionAction::Delete(arg) => {
            ctx.service
                .delete_subscription(&arg.subscription)
                .await
                .with_context(|| format!("delete subscription {}", arg.subscription))?;
            let path = subscription_path(&ctx.project, &arg.subscription);
            out.emit(&Deleted { deleted: &path }, || {
                vec![format!("Subscription {path} deleted.")]
            })
        }
        SubscriptionAction::List(list_args) => match list_args.topic {
            Some(topic) => {
                let names = ctx
                    .service
                    .list_topic_subscriptions(&topic)
                    .await
                    .with_context(|| format!("list subscriptions of {topic}"))?;
                out.emit(&names, || name_table(&names))
            }
            None => {
                let subscriptions = ctx
                    .service
                    .list_subscriptions()
                    .await
                    .context("list subscriptions")?;
                out.emit(&subscriptions, || subscription_table(&subscriptions))
            }
        },
        SubscriptionAction::Get(arg) => {
            let subscription = ctx
                .service
                .get_subscription(&arg.subscription)
                .await
                .with_context(|| format!("get subscription {}", arg.subscription))?;
            out.emit(&subscription, || describe_subscription(&subscription))
        }
        SubscriptionAction::Pull(pull_args) => pull(ctx, pull_args, &mut out).await,
        SubscriptionAction::GetPolicy(arg) => {
            policy::get_policy(ctx, IamResource::Subscription(&arg.subscription), &mut out).await
        }
        SubscriptionAction::SetPolicy(policy_args) => {
            policy::set_policy(
                ctx,
                IamResource::Subscription(&policy_args.name),
                policy_args.bindings,
                &mut out,
            )
            .await
        }
        SubscriptionAction::TestPermissions(test_args) => {
            policy::test_permissions(
                ctx,
                IamResource::Subscription(&test_args.name),
                test_args.permissions,
                SUBSCRIPTION_PERMISSIONS,
                &mut out,
            )
            .await
        }
    }
}

async fn create(
    ctx: &CommandContext,
    args: CreateSubscriptionArgs,
    out: &mut Output<'_>,
) -> Result<()> {
    let mut request = Subscription::new(&args.subscription, &args.topic);
    if let Some(seconds) = args.ack_deadline {
        request = request.with_ack_deadline(seconds);
    }
    if let Some(endpoint) = args.push_endpoint {
        request = request.with_push_endpoint(endpoint);
    }
    let created = ctx
        .service
        .create_subscription(&request)
        .await
        .with_context(|| format!("create subscription {}", args.subscription))?;
    tracing::info!(subscription = %created.name, topic = %created.topic, "subscription created");
    out.emit(&created, || {
        vec![format!("Subscription {} created.", created.name)]
    })
}

async fn pull(ctx: &CommandContext, args: PullArgs, out: &mut Output<'_>) -> Result<()> {
    let max_messages = args.max_messages.unwrap_or(ctx.pull.max_messages);
    let messages = ctx
        .service
        .pull(&args.subscription, max_messages)
        .await
        .with_context(|| format!("pull from {}", args.subscription))?;

    let acknowledge = ctx.pull.auto_ack && !args.no_ack;
    let mut acknowledged = 0;
    if acknowledge && !messages.is_empty() {
        let ack_ids: Vec<String> = messages.iter().map(|m| m.ack_id.clone()).collect();
        ctx.service
            .acknowledge(&args.subscription, &ack_ids)
            .await
            .with_context(|| format!("acknowledge messages on {}", args.subscription))?;
        acknowledged = ack_ids.len();
    }

    let path = subscription_path(&ctx.project, &args.subscription);
    let report = PullReport {
        subscription: &path,
        messages: &messages,
        acknowledged,
    };
    out.emit(&report, || {
        let mut lines = vec![format!("Received {} messages.", messages.len())];
        lines.extend(messages.iter().map(describe_received));
        if acknowledged > 0 {
            lines.push(format!("Acknowledged {acknowledged} messages."));
        }
        lines
    })
}

fn describe_received(received: &ReceivedMessage) -> String {
    let msg = &received.message;
    let id = msg.message_id.as_deref().unwrap_or("-");
    let data = match msg.data_utf8() {
        Some(text) => text.to_string(),
        None => format!("<{} bytes>", msg.data.len()),
    };
    if msg.attributes.is_empty() {
        format!("* {id} {data}")
    } else {
        let attributes = serde_json::to_string(&msg.attributes).unwrap_or_default();
        format!("* {id} {data} {attributes}")
    }
}

fn subscription_table(subscriptions: &[Subscription]) -> Vec<String> {
    if subscriptions.is_empty() {
        return vec!["No subscriptions found.".into()];
    }
    let mut lines = vec!["Subscriptions:".to_string()];
    lines.extend(
        subscriptions
            .iter()
            .map(|sub| format!("  {} (topic: {})", sub.name, sub.topic)),
    );
    lines
}

fn name_table(names: &[String]) -> Vec<String> {
    if names.is_empty() {
        return vec!["No subscriptions found.".into()];
    }
    let mut lines = vec!["Subscriptions:".to_string()];
    lines.extend(names.iter().map(|name| format!("  {name}")));
    lines
}

fn describe_subscription(subscription: &Subscription) -> Vec<String> {
    let mut lines = vec![
        format!("Subscription: {}", subscription.name),
        format!("Topic: {}", subscription.topic),
    ];
    match &subscription.push_config {
        Some(push) if subscription.is_push() => {
            lines.push(format!("Push endpoint: {}", push.push_endpoint));
        }
        _ => lines.push("Delivery: pull".into()),
    }
    if let Some(seconds) = subscription.ack_deadline_seconds {
        lines.push(format!("Ack deadline: {seconds}s"));
    }
    if let Some(retention) = &subscription.message_retention_duration {
        lines.push(format!("Retention: {retention}"));
    }
    lines
}
