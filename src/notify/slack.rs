use tracing::{error, info};

use crate::error::NotifyError;
use crate::notify::message::alert_body;
use crate::types::{FailureRecord, NotificationConfig, SlackAttachment, SlackField, SlackPayload};

const ATTACHMENT_COLOR: &str = "danger";

/// Slack incoming-webhook transport.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    webhook_url: String,
    channel: String,
    title: String,
    user: String,
    icon: Option<String>,
    client: reqwest::Client,
}

impl SlackNotifier {
    pub fn initialize(cfg: &NotificationConfig) -> Result<Self, NotifyError> {
        let webhook_url = cfg.slack_webhook_url.clone().filter(|s| !s.is_empty());
        let channel = cfg.slack_channel.clone().filter(|s| !s.is_empty());
        let (Some(webhook_url), Some(channel)) = (webhook_url, channel) else {
            return Err(NotifyError::NotConfigured("missing slack webhook or channel"));
        };

        Ok(Self {
            webhook_url,
            channel,
            title: cfg.slack_title.clone(),
            user: cfg.slack_user.clone(),
            icon: cfg.slack_icon.clone(),
            client: reqwest::Client::new(),
        })
    }

    pub fn build_payload(&self, record: &FailureRecord) -> SlackPayload {
        build_slack_payload(&self.channel, &self.user, self.icon.as_deref(), &self.title, record)
    }

    pub async fn dispatch(&self, record: &FailureRecord) -> Result<(), NotifyError> {
        let payload = self.build_payload(record);
        send_to_slack(&self.client, &self.webhook_url, &payload).await
    }
}

pub fn build_slack_payload(
    channel: &str,
    user: &str,
    icon: Option<&str>,
    title: &str,
    record: &FailureRecord,
) -> SlackPayload {
    let body = alert_body(record);
    SlackPayload {
        channel: channel.to_string(),
        username: user.to_string(),
        icon_url: icon.map(str::to_string),
        attachments: vec![SlackAttachment {
            fallback: body.clone(),
            color: ATTACHMENT_COLOR.to_string(),
            title: title.to_string(),
            fields: vec![SlackField { value: body }],
        }],
    }
}

pub async fn send_to_slack(
    client: &reqwest::Client,
    webhook_url: &str,
    payload: &SlackPayload,
) -> Result<(), NotifyError> {
    let res = client.post(webhook_url).json(payload).send().await?;
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        error!("Slack webhook failed: {} - {}", status, body);
        return Err(NotifyError::Rejected {
            transport: "slack",
            status: status.as_u16(),
            body,
        });
    }
    info!("Slack message sent to {}", payload.channel);
    Ok(())
}
