use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

use crate::dedup::{DEFAULT_QUIET_WINDOW_MINUTES, MAX_QUIET_WINDOW_MINUTES};
use crate::notify::appinsights::DEFAULT_INGESTION_ENDPOINT;
use crate::timezone::resolve_zone;
use crate::types::{Config, HandlerKind, NotificationConfig};

const DEFAULT_SELF: &str = "crashwatch";
const DEFAULT_SLACK_USER: &str = "crashwatch";
const DEFAULT_SLACK_TITLE: &str = "There has been a pod error in production!";
const DEFAULT_EVENT_TITLE: &str = "Pod failure";

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        // Empty values behave like unset ones
        self.vars.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

/// On-disk JSON settings. Every key is optional; the environment fills gaps.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub namespace: Option<String>,
    pub debug: Option<bool>,
    #[serde(rename = "self")]
    pub self_name: Option<String>,
    #[serde(rename = "time")]
    pub time_check: Option<i64>,
    pub timezone: Option<String>,
    #[serde(default, rename = "notifications")]
    pub notification: NotificationFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFile {
    #[serde(rename = "type")]
    pub handler: Option<String>,
    pub slack_webhook: Option<String>,
    pub slack_channel: Option<String>,
    pub slack_title: Option<String>,
    pub slack_user: Option<String>,
    pub slack_icon: Option<String>,
    pub instrumentation_key: Option<String>,
    pub custom_event_title: Option<String>,
    pub ingestion_endpoint: Option<String>,
}

pub fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Unable to open config file {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_json::from_str(&content)
        .with_context(|| format!("Error parsing config file {}", path.display()))
}

/// Load settings from `path` (unless `None`) overlaid with the process environment.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let file = match path {
        Some(p) => read_config_file(p)?,
        None => ConfigFile::default(),
    };
    load_config_with_env(file, &SystemEnvironment)
}

pub fn load_config_with_env<E: EnvironmentProvider>(file: ConfigFile, env: &E) -> Result<Config> {
    let non_empty =
        |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let pick = |from_file: Option<String>, key: &str| {
        non_empty(from_file).or_else(|| non_empty(env.get_var(key)))
    };

    let namespace = pick(file.namespace, "CRASHWATCH_NAMESPACE").ok_or_else(|| {
        anyhow!("please ensure the config has a namespace specified (CRASHWATCH_NAMESPACE)")
    })?;

    let debug = file.debug.unwrap_or(false)
        || env
            .get_var("CRASHWATCH_DEBUG")
            .and_then(|v| parse_bool(&v))
            .unwrap_or(false);

    let quiet_window_minutes = file
        .time_check
        .filter(|m| valid_quiet_window(*m))
        .or_else(|| {
            env.get_var("CRASHWATCH_TIMECHECK")
                .and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|m| valid_quiet_window(*m))
        })
        .unwrap_or(DEFAULT_QUIET_WINDOW_MINUTES);

    let time_zone = resolve_zone(&pick(file.timezone, "CRASHWATCH_TIMEZONE").unwrap_or_default());

    let self_name =
        pick(file.self_name, "CRASHWATCH_SELF").or_else(|| Some(DEFAULT_SELF.to_string()));

    let n = file.notification;
    let handler = HandlerKind::parse(&pick(n.handler, "CRASHWATCH_HANDLER").unwrap_or_default());
    let notification = NotificationConfig {
        handler,
        slack_webhook_url: pick(n.slack_webhook, "CRASHWATCH_WEBHOOK"),
        slack_channel: pick(n.slack_channel, "CRASHWATCH_CHANNEL"),
        slack_title: pick(n.slack_title, "CRASHWATCH_TITLE")
            .unwrap_or_else(|| DEFAULT_SLACK_TITLE.to_string()),
        slack_user: pick(n.slack_user, "CRASHWATCH_USER")
            .unwrap_or_else(|| DEFAULT_SLACK_USER.to_string()),
        slack_icon: pick(n.slack_icon, "CRASHWATCH_ICON"),
        instrumentation_key: pick(n.instrumentation_key, "CRASHWATCH_INSTRUMENTATION_KEY"),
        custom_event_title: pick(n.custom_event_title, "CRASHWATCH_EVENT_TITLE")
            .unwrap_or_else(|| DEFAULT_EVENT_TITLE.to_string()),
        ingestion_endpoint: non_empty(n.ingestion_endpoint)
            .unwrap_or_else(|| DEFAULT_INGESTION_ENDPOINT.to_string()),
    };

    Ok(Config {
        namespace,
        debug,
        self_name,
        quiet_window_minutes,
        time_zone,
        notification,
    })
}

fn valid_quiet_window(minutes: i64) -> bool {
    if minutes > 0 && minutes <= MAX_QUIET_WINDOW_MINUTES {
        return true;
    }
    warn!(
        "Ignoring quiet window of {} minutes, expected 1..={}",
        minutes, MAX_QUIET_WINDOW_MINUTES
    );
    false
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}
