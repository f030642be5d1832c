use chrono_tz::Tz;
use tracing::warn;

use crate::types::FailureRecord;

/// Zone used when none is configured or the configured one cannot be resolved.
pub const DEFAULT_TIME_ZONE: Tz = chrono_tz::America::New_York;

/// Resolve an IANA zone identifier, falling back to [`DEFAULT_TIME_ZONE`].
pub fn resolve_zone(name: &str) -> Tz {
    let name = name.trim();
    if name.is_empty() {
        return DEFAULT_TIME_ZONE;
    }
    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            warn!("Unknown time zone '{}', falling back to {}", name, DEFAULT_TIME_ZONE.name());
            DEFAULT_TIME_ZONE
        }
    }
}

/// Rewrite the cluster-reported timestamps of `record` into `zone`.
///
/// `seen_at` stays in UTC; it only takes part in elapsed-time arithmetic.
pub fn normalize(mut record: FailureRecord, zone: Tz) -> FailureRecord {
    record.started_at = record.started_at.map(|t| t.with_timezone(&zone));
    record.finished_at = record.finished_at.map(|t| t.with_timezone(&zone));
    record
}
