use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Config {
    pub namespace: String,
    pub debug: bool,
    pub self_name: Option<String>,
    pub quiet_window_minutes: i64,
    pub time_zone: Tz,
    pub notification: NotificationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Slack,
    AppInsights,
    Stdout,
}

impl HandlerKind {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "slack" | "sl" => HandlerKind::Slack,
            "appinsights" | "ai" | "applicationinsights" => HandlerKind::AppInsights,
            _ => HandlerKind::Stdout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub handler: HandlerKind,
    pub slack_webhook_url: Option<String>,
    pub slack_channel: Option<String>,
    pub slack_title: String,
    pub slack_user: String,
    pub slack_icon: Option<String>,
    pub instrumentation_key: Option<String>,
    pub custom_event_title: String,
    pub ingestion_endpoint: String,
}

/// Normalized snapshot of one pod/container termination.
///
/// Empty strings mean "unknown". `exit_code == -1` marks a pod that failed
/// before any container reported a status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FailureRecord {
    pub namespace: String,
    pub pod_name: String,
    pub container_name: String,
    pub image: String,
    pub started_at: Option<DateTime<Tz>>,
    pub finished_at: Option<DateTime<Tz>>,
    pub exit_code: i32,
    pub reason: String,
    pub message: String,
    pub seen_at: DateTime<Utc>,
}

impl FailureRecord {
    /// A record with no image, no container or no finish time describes a pod
    /// that is still pending or only ran containers to completion.
    pub fn is_failure(&self) -> bool {
        !self.image.is_empty() && !self.container_name.is_empty() && self.finished_at.is_some()
    }
}

#[derive(Debug, Serialize)]
pub struct SlackPayload {
    pub channel: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    pub attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Serialize)]
pub struct SlackAttachment {
    pub fallback: String,
    pub color: String,
    pub title: String,
    pub fields: Vec<SlackField>,
}

#[derive(Debug, Serialize)]
pub struct SlackField {
    pub value: String,
}
