//! Notification dispatch adapter.
//!
//! A transport is chosen once at startup from [`NotificationConfig::handler`]
//! and validated by [`Notifier::initialize`]. Dispatch failures are reported to
//! the caller and never retried here.

pub mod appinsights;
pub mod message;
pub mod slack;
pub mod stdout;

use async_trait::async_trait;
use tracing::info;

use crate::error::NotifyError;
use crate::types::{FailureRecord, HandlerKind, NotificationConfig};

pub use appinsights::AppInsightsNotifier;
pub use slack::SlackNotifier;
pub use stdout::StdoutNotifier;

/// Anything that can turn a failure record into an outbound alert.
#[async_trait]
pub trait AlertHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn dispatch(&self, record: &FailureRecord) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone)]
pub enum Notifier {
    Slack(SlackNotifier),
    AppInsights(AppInsightsNotifier),
    Stdout(StdoutNotifier),
}

impl Notifier {
    pub fn initialize(cfg: &NotificationConfig) -> Result<Self, NotifyError> {
        let notifier = match cfg.handler {
            HandlerKind::Slack => Notifier::Slack(SlackNotifier::initialize(cfg)?),
            HandlerKind::AppInsights => {
                Notifier::AppInsights(AppInsightsNotifier::initialize(cfg)?)
            }
            HandlerKind::Stdout => Notifier::Stdout(StdoutNotifier),
        };
        info!("Using the {} notification handler", notifier.name());
        Ok(notifier)
    }
}

#[async_trait]
impl AlertHandler for Notifier {
    fn name(&self) -> &'static str {
        match self {
            Notifier::Slack(_) => "slack",
            Notifier::AppInsights(_) => "appinsights",
            Notifier::Stdout(_) => "stdout",
        }
    }

    async fn dispatch(&self, record: &FailureRecord) -> Result<(), NotifyError> {
        match self {
            Notifier::Slack(n) => n.dispatch(record).await,
            Notifier::AppInsights(n) => n.dispatch(record).await,
            Notifier::Stdout(n) => n.dispatch(record).await,
        }
    }
}
