use serde::Serialize;

use crate::error::NotifyError;
use crate::notify::message::format_rfc3339;
use crate::types::FailureRecord;

/// Console transport: one JSON object per alert on stdout.
#[derive(Debug, Clone, Default)]
pub struct StdoutNotifier;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleRecord<'a> {
    pub namespace: &'a str,
    pub pod_name: &'a str,
    pub container_name: &'a str,
    pub image: &'a str,
    pub started_at: String,
    pub finished_at: String,
    pub exit_code: i32,
    pub reason: &'a str,
    pub message: &'a str,
    pub seen_at: String,
}

impl<'a> From<&'a FailureRecord> for ConsoleRecord<'a> {
    fn from(record: &'a FailureRecord) -> Self {
        Self {
            namespace: &record.namespace,
            pod_name: &record.pod_name,
            container_name: &record.container_name,
            image: &record.image,
            started_at: format_rfc3339(record.started_at.as_ref()),
            finished_at: format_rfc3339(record.finished_at.as_ref()),
            exit_code: record.exit_code,
            reason: &record.reason,
            message: &record.message,
            seen_at: record.seen_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        }
    }
}

impl StdoutNotifier {
    pub fn render(&self, record: &FailureRecord) -> Result<String, NotifyError> {
        Ok(serde_json::to_string(&ConsoleRecord::from(record))?)
    }

    pub async fn dispatch(&self, record: &FailureRecord) -> Result<(), NotifyError> {
        println!("{}", self.render(record)?);
        Ok(())
    }
}
