use chrono::Utc;
use chrono_tz::Tz;
use k8s_openapi::api::core::v1::Pod;

use crate::types::FailureRecord;

const PHASE_FAILED: &str = "Failed";
const REASON_COMPLETED: &str = "Completed";
const UNKNOWN: &str = "Unknown";

/// Build a [`FailureRecord`] from a pod status snapshot.
///
/// A pod that failed before any container reported a status gets
/// `exit_code = -1` and the first declared container's identity. Otherwise the
/// first terminated container that did not simply complete is copied. When no
/// such container exists the record has no finish time and is not a failure.
pub fn extract_failure(pod: &Pod) -> FailureRecord {
    let status = pod.status.as_ref();
    let created_at = pod
        .metadata
        .creation_timestamp
        .as_ref()
        .map(|t| t.0.with_timezone(&Tz::UTC));

    let mut record = FailureRecord {
        namespace: pod.metadata.namespace.clone().unwrap_or_default(),
        pod_name: pod.metadata.name.clone().unwrap_or_default(),
        started_at: created_at,
        message: status.and_then(|s| s.message.clone()).unwrap_or_default(),
        seen_at: Utc::now(),
        ..Default::default()
    };

    let container_statuses = status
        .and_then(|s| s.container_statuses.as_deref())
        .unwrap_or_default();
    let phase = status.and_then(|s| s.phase.as_deref()).unwrap_or("");

    if container_statuses.is_empty() && phase == PHASE_FAILED {
        record.finished_at = created_at;
        record.exit_code = -1;
        record.reason = status.and_then(|s| s.reason.clone()).unwrap_or_default();
        match pod.spec.as_ref().and_then(|spec| spec.containers.first()) {
            Some(container) => {
                record.image = container.image.clone().unwrap_or_else(|| UNKNOWN.to_string());
                record.container_name = container.name.clone();
            }
            None => {
                record.image = UNKNOWN.to_string();
                record.container_name = UNKNOWN.to_string();
            }
        }
        return record;
    }

    for cs in container_statuses {
        let Some(terminated) = cs.state.as_ref().and_then(|s| s.terminated.as_ref()) else {
            continue;
        };
        if terminated.reason.as_deref() == Some(REASON_COMPLETED) {
            continue;
        }
        record.finished_at = terminated
            .finished_at
            .as_ref()
            .map(|t| t.0.with_timezone(&Tz::UTC));
        record.image = cs.image.clone();
        record.container_name = cs.name.clone();
        record.exit_code = terminated.exit_code;
        record.reason = terminated.reason.clone().unwrap_or_default();
        record.message = terminated.message.clone().unwrap_or_default();
        break;
    }

    record
}
