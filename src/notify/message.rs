use chrono::DateTime;
use chrono_tz::Tz;

use crate::types::FailureRecord;

/// Fixed-width stamp, e.g. `Jan  2 15:04:05`.
const STAMP_FORMAT: &str = "%b %e %H:%M:%S";

pub fn exit_code_meaning(exit_code: i32) -> Option<&'static str> {
    match exit_code {
        139 => Some("Segmentation fault."),
        143 => Some("The container received a SIGTERM."),
        137 => Some("The container received a SIGKILL."),
        127 => Some("Command not found."),
        130 => Some("Container terminated."),
        126 => Some(
            "There was an error regarding permissions or the container could not be invoked.",
        ),
        125 => Some("The container run command has failed."),
        1 => Some("Application Error."),
        _ => None,
    }
}

pub fn failure_reason(record: &FailureRecord) -> String {
    match (record.reason.is_empty(), record.message.is_empty()) {
        (false, false) => format!(
            "Failure reason received : `{} - {}`",
            record.reason, record.message
        ),
        (true, false) => format!("Failure reason received : `{}`", record.message),
        (false, true) => format!("Failure reason received : `{}`", record.reason),
        (true, true) => "Unable to determine the reason for the failure.".to_string(),
    }
}

pub fn error_code_line(record: &FailureRecord) -> String {
    match exit_code_meaning(record.exit_code) {
        Some(meaning) => format!("Error code : {} `{}`", record.exit_code, meaning),
        None => format!("Error code : {}", record.exit_code),
    }
}

pub fn format_stamp(time: Option<&DateTime<Tz>>) -> String {
    time.map(|t| t.format(STAMP_FORMAT).to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn format_rfc3339(time: Option<&DateTime<Tz>>) -> String {
    time.map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// Human readable alert text shared by the chat transports.
pub fn alert_body(record: &FailureRecord) -> String {
    format!(
        "The pod : *{}* has encountered an error.\n\nThe container is : *{}*\nWhich is running image : *{}*.\nThe error information is below.\n\n\n> {}\n> {}\n> The pod ran from : *{} until {}*",
        record.pod_name,
        record.container_name,
        record.image,
        failure_reason(record),
        error_code_line(record),
        format_stamp(record.started_at.as_ref()),
        format_stamp(record.finished_at.as_ref()),
    )
}
