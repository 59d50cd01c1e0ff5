//! IAM policy commands shared by topics and subscriptions.

use super::{CommandContext, Output};
use crate::service::{IamResource, Policy};
use anyhow::{Context, Result};
use serde::Serialize;

pub(super) const TOPIC_PERMISSIONS: &[&str] = &[
    "pubsub.topics.attachSubscription",
    "pubsub.topics.publish",
    "pubsub.topics.update",
];

pub(super) const SUBSCRIPTION_PERMISSIONS: &[&str] =
    &["pubsub.subscriptions.consume", "pubsub.subscriptions.update"];

#[derive(Serialize)]
struct PermissionReport<'a> {
    resource: &'a str,
    requested: &'a [String],
    granted: &'a [String],
}

pub(super) async fn get_policy(
    ctx: &CommandContext,
    resource: IamResource<'_>,
    out: &mut Output<'_>,
) -> Result<()> {
    let path = resource.path(&ctx.project);
    let policy = ctx
        .service
        .get_iam_policy(resource)
        .await
        .with_context(|| format!("get policy for {path}"))?;
    out.emit(&policy, || policy_lines(&format!("Policy for {path}:"), &policy))
}

pub(super) async fn set_policy(
    ctx: &CommandContext,
    resource: IamResource<'_>,
    bindings: Vec<(String, String)>,
    out: &mut Output<'_>,
) -> Result<()> {
    let path = resource.path(&ctx.project);
    let policy = Policy::from_pairs(bindings);
    let updated = ctx
        .service
        .set_iam_policy(resource, &policy)
        .await
        .with_context(|| format!("set policy for {path}"))?;
    out.emit(&updated, || {
        policy_lines(&format!("Updated policy for {path}:"), &updated)
    })
}

pub(super) async fn test_permissions(
    ctx: &CommandContext,
    resource: IamResource<'_>,
    requested: Vec<String>,
    defaults: &[&str],
    out: &mut Output<'_>,
) -> Result<()> {
    let path = resource.path(&ctx.project);
    let requested = if requested.is_empty() {
        defaults.iter().map(|p| (*p).to_string()).collect()
    } else {
        requested
    };
    let granted = ctx
        .service
        .test_iam_permissions(resource, &requested)
        .await
        .with_context(|| format!("test permissions on {path}"))?;
    let report = PermissionReport {
        resource: &path,
        requested: &requested,
        granted: &granted,
    };
    out.emit(&report, || {
        let mut lines = vec![format!("Tested permissions for {path}:")];
        for permission in &requested {
            let verdict = if granted.contains(permission) {
                "granted"
            } else {
                "denied"
            };
            lines.push(format!("  {permission}: {verdict}"));
        }
        lines
    })
}

fn policy_lines(header: &str, policy: &Policy) -> Vec<String> {
    let mut lines = vec![header.to_string()];
    if policy.bindings.is_empty() {
        lines.push("  (no bindings)".into());
    }
    for binding in &policy.bindings {
        lines.push(format!("  {}: {}", binding.role, binding.members.join(", ")));
    }
    if let Some(etag) = &policy.etag {
        lines.push(format!("  etag: {etag}"));
    }
    lines
}
