//! Resource path helpers.

const PROJECTS_PREFIX: &str = "projects/";

/// Expand a topic name to `projects/{project}/topics/{topic}`.
///
/// Names that already start with `projects/` are returned unchanged.
pub fn topic_path(project: &str, topic: &str) -> String {
    qualify(project, "topics", topic)
}

/// Expand a subscription name to `projects/{project}/subscriptions/{name}`.
pub fn subscription_path(project: &str, subscription: &str) -> String {
    qualify(project, "subscriptions", subscription)
}

pub fn project_path(project: &str) -> String {
    format!("{PROJECTS_PREFIX}{project}")
}

/// Last path segment of a resource name.
pub fn short_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn qualify(project: &str, collection: &str, name: &str) -> String {
    if name.starts_with(PROJECTS_PREFIX) {
        name.to_string()
    } else {
        format!("{PROJECTS_PREFIX}{project}/{collection}/{name}")
    }
}
