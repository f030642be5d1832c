use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

use crate::error::NotifyError;
use crate::notify::message::{exit_code_meaning, format_rfc3339};
use crate::types::{FailureRecord, NotificationConfig};

pub const DEFAULT_INGESTION_ENDPOINT: &str = "https://dc.services.visualstudio.com/v2/track";

/// Application Insights custom-event transport.
#[derive(Debug, Clone)]
pub struct AppInsightsNotifier {
    instrumentation_key: String,
    event_title: String,
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
pub struct TrackEnvelope {
    pub name: String,
    pub time: String,
    #[serde(rename = "iKey")]
    pub ikey: String,
    pub data: TrackData,
}

#[derive(Debug, Serialize)]
pub struct TrackData {
    #[serde(rename = "baseType")]
    pub base_type: String,
    #[serde(rename = "baseData")]
    pub base_data: EventData,
}

#[derive(Debug, Serialize)]
pub struct EventData {
    pub ver: u8,
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

impl AppInsightsNotifier {
    pub fn initialize(cfg: &NotificationConfig) -> Result<Self, NotifyError> {
        let instrumentation_key = cfg
            .instrumentation_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(NotifyError::NotConfigured("missing instrumentation key"))?;

        Ok(Self {
            instrumentation_key,
            event_title: cfg.custom_event_title.clone(),
            endpoint: cfg.ingestion_endpoint.clone(),
            client: reqwest::Client::new(),
        })
    }

    pub fn build_envelope(&self, record: &FailureRecord) -> TrackEnvelope {
        TrackEnvelope {
            name: "Microsoft.ApplicationInsights.Event".to_string(),
            time: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            ikey: self.instrumentation_key.clone(),
            data: TrackData {
                base_type: "EventData".to_string(),
                base_data: EventData {
                    ver: 2,
                    name: self.event_title.clone(),
                    properties: event_properties(record),
                },
            },
        }
    }

    pub async fn dispatch(&self, record: &FailureRecord) -> Result<(), NotifyError> {
        let envelope = self.build_envelope(record);
        let res = self.client.post(&self.endpoint).json(&envelope).send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            error!("Telemetry ingestion failed: {} - {}", status, body);
            return Err(NotifyError::Rejected {
                transport: "appinsights",
                status: status.as_u16(),
                body,
            });
        }
        info!("Telemetry event '{}' tracked for pod {}", self.event_title, record.pod_name);
        Ok(())
    }
}

/// Flat property map carried by the custom event.
pub fn event_properties(record: &FailureRecord) -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();
    props.insert("namespace".to_string(), record.namespace.clone());
    props.insert("pod".to_string(), record.pod_name.clone());
    props.insert("container".to_string(), record.container_name.clone());
    props.insert("image".to_string(), record.image.clone());
    props.insert("exitCode".to_string(), record.exit_code.to_string());
    props.insert(
        "exitCodeMeaning".to_string(),
        exit_code_meaning(record.exit_code).unwrap_or_default().to_string(),
    );
    props.insert("reason".to_string(), record.reason.clone());
    props.insert("message".to_string(), record.message.clone());
    props.insert("startedAt".to_string(), format_rfc3339(record.started_at.as_ref()));
    props.insert("finishedAt".to_string(), format_rfc3339(record.finished_at.as_ref()));
    props
}
