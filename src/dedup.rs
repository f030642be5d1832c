use chrono::Duration;

use crate::types::FailureRecord;

/// Default quiet window in minutes.
pub const DEFAULT_QUIET_WINDOW_MINUTES: i64 = 3;

/// Largest quiet window accepted from configuration (one week).
pub const MAX_QUIET_WINDOW_MINUTES: i64 = 7 * 24 * 60;

/// Decide whether `candidate` is a distinct failure compared to the last
/// record an alert was dispatched for.
///
/// Rules are evaluated in order and the first match wins. A crash-looping
/// container produces a stream of near-identical records; those are folded
/// into one alert until `quiet_window_minutes` of wall time has passed since
/// the last alert.
pub fn is_new(
    candidate: &FailureRecord,
    last_emitted: &FailureRecord,
    quiet_window_minutes: i64,
) -> bool {
    if !candidate.is_failure() {
        return false;
    }

    if quiet_window_elapsed(candidate, last_emitted, quiet_window_minutes) {
        return true;
    }

    if candidate == last_emitted {
        return false;
    }

    // NOTE: compares the container name against the previous *pod* name.
    // Kept as-is; it has always behaved this way.
    if candidate.pod_name == last_emitted.pod_name
        && candidate.container_name == last_emitted.pod_name
    {
        return false;
    }

    // Same pod instance restarting in place.
    if candidate.pod_name == last_emitted.pod_name
        && candidate.started_at == last_emitted.started_at
    {
        return false;
    }

    // Same crash signature.
    if candidate.container_name == last_emitted.container_name
        && candidate.exit_code == last_emitted.exit_code
    {
        return false;
    }

    if candidate.pod_name == last_emitted.pod_name
        && candidate.exit_code == last_emitted.exit_code
    {
        return false;
    }

    true
}

/// A window too large to represent never elapses.
fn quiet_window_elapsed(
    candidate: &FailureRecord,
    last_emitted: &FailureRecord,
    quiet_window_minutes: i64,
) -> bool {
    match Duration::try_minutes(quiet_window_minutes) {
        Some(window) => candidate.seen_at - last_emitted.seen_at > window,
        None => false,
    }
}
