use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use k8s_openapi::api::core::v1::{
    ContainerState, ContainerStateTerminated, ContainerStatus, Pod, PodStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use mockito::Matcher;
use std::io::Write;

use crashwatch::notify::AlertHandler;
use crashwatch::{
    extract_failure, is_new, load_config, normalize, AlertPipeline, FailureRecord, HandlerKind,
    NotificationConfig, Notifier, NotifyError, Outcome,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn record(pod: &str, container: &str, exit_code: i32, seen_offset_secs: i64) -> FailureRecord {
    FailureRecord {
        namespace: "prod".to_string(),
        pod_name: pod.to_string(),
        container_name: container.to_string(),
        image: "registry.local/api:3".to_string(),
        started_at: Some((t0() + Duration::seconds(seen_offset_secs)).with_timezone(&Tz::UTC)),
        finished_at: Some((t0() + Duration::seconds(seen_offset_secs)).with_timezone(&Tz::UTC)),
        exit_code,
        reason: "Error".to_string(),
        message: String::new(),
        seen_at: t0() + Duration::seconds(seen_offset_secs),
    }
}

fn crashed_pod(name: &str, container: &str, exit_code: i32) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("prod".to_string()),
            creation_timestamp: Some(Time(Utc::now())),
            ..Default::default()
        },
        spec: None,
        status: Some(PodStatus {
            phase: Some("Running".to_string()),
            container_statuses: Some(vec![ContainerStatus {
                name: container.to_string(),
                image: "registry.local/api:3".to_string(),
                state: Some(ContainerState {
                    terminated: Some(ContainerStateTerminated {
                        exit_code,
                        reason: Some("OOMKilled".to_string()),
                        finished_at: Some(Time(Utc::now())),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            ..Default::default()
        }),
    }
}

fn notification_config(handler: HandlerKind) -> NotificationConfig {
    NotificationConfig {
        handler,
        slack_webhook_url: None,
        slack_channel: None,
        slack_title: "Pod error".to_string(),
        slack_user: "crashwatch".to_string(),
        slack_icon: Some("https://example.test/icon.png".to_string()),
        instrumentation_key: None,
        custom_event_title: "Pod failure".to_string(),
        ingestion_endpoint: "http://127.0.0.1:1/v2/track".to_string(),
    }
}

#[test]
fn test_crash_loop_example_within_quiet_window() {
    let last = record("api-7f", "worker", 137, 0);
    let mut candidate = record("api-7f", "worker", 137, 30);
    candidate.started_at = last.started_at.map(|t| t + Duration::seconds(10));

    assert!(!is_new(&candidate, &last, 5));
}

#[test]
fn test_crash_loop_example_after_quiet_window() {
    let last = record("api-7f", "worker", 137, 0);
    let candidate = record("api-7f", "worker", 137, 6 * 60);

    assert!(is_new(&candidate, &last, 5));
}

#[test]
fn test_restarts_with_new_codes_beyond_window_alert_each_time() {
    let mut last = FailureRecord::default();
    let mut alerts = 0;
    for (i, code) in [1, 137, 139].into_iter().enumerate() {
        let candidate = record("api-7f", "worker", code, (i as i64 + 1) * 10 * 60);
        if is_new(&candidate, &last, 5) {
            alerts += 1;
            last = candidate;
        }
    }
    assert_eq!(alerts, 3);
}

#[test]
fn test_reflexive_records_are_not_new() {
    for window in [0, 1, 5, 60] {
        let r = record("api-7f", "worker", 1, 0);
        assert!(!is_new(&r, &r, window));
    }
}

#[test]
fn test_extract_then_normalize() {
    let pod = crashed_pod("api-7f", "worker", 137);
    let record = normalize(extract_failure(&pod), chrono_tz::America::Chicago);

    assert!(record.is_failure());
    assert_eq!(record.exit_code, 137);
    assert_eq!(record.reason, "OOMKilled");
    assert_eq!(record.finished_at.unwrap().timezone(), chrono_tz::America::Chicago);
}

#[test]
fn test_load_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r##"{{
            "namespace": "checkout",
            "debug": true,
            "self": "crashwatch",
            "time": 7,
            "timezone": "America/Los_Angeles",
            "labels": "ignored",
            "notifications": {{
                "type": "slack",
                "slackWebhook": "https://hooks.slack.com/services/test",
                "slackChannel": "#checkout",
                "slackTitle": "Checkout pod failure"
            }}
        }}"##
    )
    .unwrap();

    let config = load_config(Some(file.path())).unwrap();

    assert_eq!(config.namespace, "checkout");
    assert!(config.debug);
    assert_eq!(config.quiet_window_minutes, 7);
    assert_eq!(config.time_zone, chrono_tz::America::Los_Angeles);
    assert_eq!(config.notification.handler, HandlerKind::Slack);
    assert_eq!(config.notification.slack_channel.as_deref(), Some("#checkout"));
    assert_eq!(config.notification.slack_title, "Checkout pod failure");
}

#[test]
fn test_load_config_missing_or_broken_file() {
    let missing = std::path::Path::new("/nonexistent/crashwatch.json");
    assert!(load_config(Some(missing)).is_err());

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    let err = load_config(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("Error parsing config file"));
}

#[test]
fn test_stdout_dispatch() {
    let notifier = Notifier::initialize(&notification_config(HandlerKind::Stdout)).unwrap();
    let result = tokio_test::block_on(notifier.dispatch(&record("api-7f", "worker", 1, 0)));
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_slack_dispatch_posts_attachment() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/hook")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "channel": "#ops",
            "username": "crashwatch",
            "attachments": [{"color": "danger", "title": "Pod error"}]
        })))
        .with_status(200)
        .with_body("ok")
        .expect(1)
        .create_async()
        .await;

    let mut cfg = notification_config(HandlerKind::Slack);
    cfg.slack_webhook_url = Some(format!("{}/hook", server.url()));
    cfg.slack_channel = Some("#ops".to_string());
    let notifier = Notifier::initialize(&cfg).unwrap();

    notifier.dispatch(&record("api-7f", "worker", 137, 0)).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_slack_rejection_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/hook")
        .with_status(500)
        .with_body("invalid_payload")
        .create_async()
        .await;

    let mut cfg = notification_config(HandlerKind::Slack);
    cfg.slack_webhook_url = Some(format!("{}/hook", server.url()));
    cfg.slack_channel = Some("#ops".to_string());
    let notifier = Notifier::initialize(&cfg).unwrap();

    let err = notifier.dispatch(&record("api-7f", "worker", 137, 0)).await.unwrap_err();
    match err {
        NotifyError::Rejected { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "invalid_payload");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_appinsights_dispatch_posts_event() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v2/track")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "iKey": "k-1",
            "data": {
                "baseType": "EventData",
                "baseData": {
                    "name": "Pod failure",
                    "properties": {"pod": "api-7f", "exitCode": "1"}
                }
            }
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let mut cfg = notification_config(HandlerKind::AppInsights);
    cfg.instrumentation_key = Some("k-1".to_string());
    cfg.ingestion_endpoint = format!("{}/v2/track", server.url());
    let notifier = Notifier::initialize(&cfg).unwrap();

    notifier.dispatch(&record("api-7f", "worker", 1, 0)).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_pipeline_sends_one_slack_alert_per_crash_loop() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/hook")
        .with_status(200)
        .with_body("ok")
        .expect(1)
        .create_async()
        .await;

    let mut cfg = notification_config(HandlerKind::Slack);
    cfg.slack_webhook_url = Some(format!("{}/hook", server.url()));
    cfg.slack_channel = Some("#ops".to_string());
    let notifier = Notifier::initialize(&cfg).unwrap();
    let mut pipeline = AlertPipeline::new(notifier, chrono_tz::UTC, 5);

    assert_eq!(pipeline.offer(&crashed_pod("api-7f", "worker", 137)).await, Outcome::Dispatched);
    assert_eq!(pipeline.offer(&crashed_pod("api-7f", "worker", 137)).await, Outcome::Suppressed);
    assert_eq!(pipeline.offer(&crashed_pod("api-7f", "worker", 137)).await, Outcome::Suppressed);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_pipeline_dispatch_failure_leaves_baseline() {
    // Nothing listens on port 1.
    let mut cfg = notification_config(HandlerKind::AppInsights);
    cfg.instrumentation_key = Some("k-1".to_string());
    let notifier = Notifier::initialize(&cfg).unwrap();
    let mut pipeline = AlertPipeline::new(notifier, chrono_tz::UTC, 5);

    let outcome = pipeline.offer(&crashed_pod("api-7f", "worker", 137)).await;

    assert_eq!(outcome, Outcome::DispatchFailed);
    assert_eq!(pipeline.last_emitted(), &FailureRecord::default());
}
