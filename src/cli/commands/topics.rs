//! Topic commands.

use super::policy::{self, TOPIC_PERMISSIONS};
use super::{CommandContext, Output};
use crate::cli::args::{PublishArgs, PublishOrderedArgs, TopicAction, TopicsArgs};
use crate::messaging::{parse_json, MessageDraft, OrderedReceipt, ValidationError};
use crate::service::names::{short_name, topic_path};
use crate::service::{IamResource, Topic};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct Deleted<'a> {
    deleted: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Published<'a> {
    topic: &'a str,
    message_ids: &'a [String],
}

pub async fn run_topics(
    args: TopicsArgs,
    ctx: &CommandContext,
    out: &mut dyn Write,
) -> Result<()> {
    let mut out = Output::new(ctx.format, out);
    match args.action {
        TopicAction::Create(arg) => {
            let topic = ctx
                .service
                .create_topic(&arg.topic)
                .await
                .with_context(|| format!("create topic {}", arg.topic))?;
            tracing::info!(topic = %topic.name, "topic created");
            out.emit(&topic, || vec![format!("Topic {} created.", topic.name)])
        }
        TopicAction::Delete(arg) => {
            ctx.service
                .delete_topic(&arg.topic)
                .await
                .with_context(|| format!("delete topic {}", arg.topic))?;
            let path = topic_path(&ctx.project, &arg.topic);
            out.emit(&Deleted { deleted: &path }, || {
                vec![format!("Topic {path} deleted.")]
            })
        }
        TopicAction::List => {
            let topics = ctx.service.list_topics().await.context("list topics")?;
            out.emit(&topics, || topic_table(&topics))
        }
        TopicAction::Get(arg) => {
            let topic = ctx
                .service
                .get_topic(&arg.topic)
                .await
                .with_context(|| format!("get topic {}", arg.topic))?;
            out.emit(&topic, || describe_topic(&topic))
        }
        TopicAction::Publish(publish_args) => publish(ctx, publish_args, &mut out).await,
        TopicAction::PublishOrdered(ordered_args) => {
            publish_ordered(ctx, ordered_args, &mut out).await
        }
        TopicAction::GetPolicy(arg) => {
            policy::get_policy(ctx, IamResource::Topic(&arg.topic), &mut out).await
        }
        TopicAction::SetPolicy(policy_args) => {
            policy::set_policy(
                ctx,
                IamResource::Topic(&policy_args.name),
                policy_args.bindings,
                &mut out,
            )
            .await
        }
        TopicAction::TestPermissions(test_args) => {
            policy::test_permissions(
                ctx,
                IamResource::Topic(&test_args.name),
                test_args.permissions,
                TOPIC_PERMISSIONS,
                &mut out,
            )
            .await
        }
    }
}

async fn publish(ctx: &CommandContext, args: PublishArgs, out: &mut Output<'_>) -> Result<()> {
    if args.topic.trim().is_empty() {
        return Err(ValidationError::EmptyTopic.into());
    }
    let mut draft = MessageDraft::parse(&args.message)?;
    for (key, value) in args.attributes {
        draft = draft.with_attribute(key, value);
    }
    let message_ids = ctx
        .service
        .publish(&args.topic, vec![draft.into_message()])
        .await
        .with_context(|| format!("publish to {}", args.topic))?;
    let path = topic_path(&ctx.project, &args.topic);
    out.emit(
        &Published {
            topic: &path,
            message_ids: &message_ids,
        },
        || {
            message_ids
                .iter()
                .map(|id| format!("Message {id} published."))
                .collect()
        },
    )
}

async fn publish_ordered(
    ctx: &CommandContext,
    args: PublishOrderedArgs,
    out: &mut Output<'_>,
) -> Result<()> {
    // Validate once up front so a bad payload never claims a sequence number.
    let draft = MessageDraft::from_value(parse_json(&args.message)?)?;
    let mut receipts = Vec::with_capacity(args.count as usize);
    for _ in 0..args.count {
        let published = ctx
            .publisher
            .publish_draft(&args.topic, draft.clone())
            .await
            .with_context(|| format!("ordered publish to {}", args.topic));
        match published {
            Ok(receipt) => receipts.push(receipt),
            Err(err) => {
                // Report the numbers that already went out before failing.
                if !receipts.is_empty() {
                    emit_receipts(&receipts, out)?;
                }
                return Err(err);
            }
        }
    }
    emit_receipts(&receipts, out)
}

fn emit_receipts(receipts: &[OrderedReceipt], out: &mut Output<'_>) -> Result<()> {
    out.emit(receipts, || {
        receipts
            .iter()
            .map(|receipt| {
                format!(
                    "Ordered message {} published to {} as {}.",
                    receipt.sequence,
                    receipt.topic,
                    receipt.message_ids.join(", ")
                )
            })
            .collect()
    })
}

fn topic_table(topics: &[Topic]) -> Vec<String> {
    if topics.is_empty() {
        return vec!["No topics found.".into()];
    }
    let mut lines = vec!["Topics:".to_string()];
    lines.extend(topics.iter().map(|topic| format!("  {}", topic.name)));
    lines
}

fn describe_topic(topic: &Topic) -> Vec<String> {
    let mut lines = vec![
        format!("Topic: {}", topic.name),
        format!("Short name: {}", short_name(&topic.name)),
    ];
    if let Some(retention) = &topic.message_retention_duration {
        lines.push(format!("Retention: {retention}"));
    }
    for (key, value) in &topic.labels {
        lines.push(format!("Label {key}: {value}"));
    }
    lines
}
