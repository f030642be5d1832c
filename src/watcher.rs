//! Pod event watch loop.
//!
//! The loop subscribes to pod changes in one namespace, filters them down to
//! modifications of live, foreign pods and feeds those through
//! extract -> normalize -> dedup -> dispatch. When the stream ends it
//! subscribes again; only a failure to open a subscription ends the loop.

use anyhow::Result;
use chrono_tz::Tz;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::WatchEvent;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::dedup::is_new;
use crate::extract::extract_failure;
use crate::kubernetes::PodEventSource;
use crate::notify::AlertHandler;
use crate::timezone::normalize;
use crate::types::{Config, FailureRecord};

/// What happened to a pod offered to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Suppressed,
    Dispatched,
    DispatchFailed,
}

/// Extract, normalize, dedup and dispatch, one pod at a time.
///
/// Owns the last record an alert was successfully sent for.
pub struct AlertPipeline<H> {
    handler: H,
    time_zone: Tz,
    quiet_window_minutes: i64,
    last_emitted: FailureRecord,
}

impl<H: AlertHandler> AlertPipeline<H> {
    pub fn new(handler: H, time_zone: Tz, quiet_window_minutes: i64) -> Self {
        Self {
            handler,
            time_zone,
            quiet_window_minutes,
            last_emitted: FailureRecord::default(),
        }
    }

    pub fn from_config(handler: H, cfg: &Config) -> Self {
        Self::new(handler, cfg.time_zone, cfg.quiet_window_minutes)
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn last_emitted(&self) -> &FailureRecord {
        &self.last_emitted
    }

    pub async fn offer(&mut self, pod: &Pod) -> Outcome {
        let candidate = normalize(extract_failure(pod), self.time_zone);
        self.offer_record(candidate).await
    }

    pub async fn offer_record(&mut self, candidate: FailureRecord) -> Outcome {
        if !is_new(&candidate, &self.last_emitted, self.quiet_window_minutes) {
            return Outcome::Suppressed;
        }

        match self.handler.dispatch(&candidate).await {
            Ok(()) => {
                self.last_emitted = candidate;
                Outcome::Dispatched
            }
            Err(e) => {
                warn!(
                    "Error sending {} notification for pod {}: {}",
                    self.handler.name(),
                    candidate.pod_name,
                    e
                );
                Outcome::DispatchFailed
            }
        }
    }
}

enum Step {
    Process(Pod),
    Skip(&'static str),
    Resubscribe,
}

fn triage(event: WatchEvent<Pod>, self_name: Option<&str>) -> Step {
    let (modified, pod) = match event {
        WatchEvent::Modified(pod) => (true, pod),
        WatchEvent::Added(pod) | WatchEvent::Deleted(pod) => (false, pod),
        WatchEvent::Bookmark(_) => return Step::Skip("no payload"),
        WatchEvent::Error(e) => {
            warn!("Watch stream reported an error: {:?}", e);
            return Step::Resubscribe;
        }
    };

    let Some(name) = pod.metadata.name.as_deref() else {
        return Step::Skip("no payload");
    };

    if let Some(self_name) = self_name {
        if name.to_lowercase().contains(self_name) {
            debug!("Skipping pod {} as it matches the self identifier '{}'", name, self_name);
            return Step::Skip("self");
        }
    }

    // Creation and deletion churn from routine deployments is too noisy.
    if !modified {
        return Step::Skip("not a modification");
    }

    let status = pod.status.as_ref();
    debug!(
        pod = name,
        phase = status.and_then(|s| s.phase.as_deref()).unwrap_or(""),
        reason = status.and_then(|s| s.reason.as_deref()).unwrap_or(""),
        message = status.and_then(|s| s.message.as_deref()).unwrap_or(""),
        "New pod change detected"
    );

    if pod.metadata.deletion_timestamp.is_some() {
        debug!("Skipping pod {} as it was marked for deletion", name);
        return Step::Skip("marked for deletion");
    }

    Step::Process(pod)
}

/// Long-lived pod watch driving an [`AlertPipeline`].
pub struct Watcher<S, H> {
    source: S,
    pipeline: AlertPipeline<H>,
    self_name: Option<String>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<S: PodEventSource, H: AlertHandler> Watcher<S, H> {
    pub fn new(source: S, pipeline: AlertPipeline<H>, self_name: Option<String>) -> Self {
        Self {
            source,
            pipeline,
            self_name: self_name
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty()),
            shutdown: None,
        }
    }

    /// Stop at the next wait for events once `true` is published on `rx`.
    pub fn with_shutdown(mut self, rx: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(rx);
        self
    }

    pub fn pipeline(&self) -> &AlertPipeline<H> {
        &self.pipeline
    }

    /// Run until shutdown is requested or a subscription cannot be created.
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting the watcher");
        loop {
            if shutdown_flag(&self.shutdown) {
                return Ok(());
            }

            let mut stream = self.source.subscribe().await?;
            debug!("Watcher created, listening for pod changes");

            loop {
                let item = tokio::select! {
                    biased;
                    _ = shutdown_requested(&mut self.shutdown) => {
                        info!("Shutdown requested, stopping the watcher");
                        return Ok(());
                    }
                    item = stream.next() => item,
                };

                let event = match item {
                    Some(Ok(event)) => event,
                    Some(Err(e)) => {
                        warn!("Watch stream error: {}", e);
                        break;
                    }
                    None => break,
                };

                match triage(event, self.self_name.as_deref()) {
                    Step::Process(pod) => {
                        let outcome = self.pipeline.offer(&pod).await;
                        debug!(
                            "Pod {} handled: {:?}",
                            pod.metadata.name.as_deref().unwrap_or_default(),
                            outcome
                        );
                    }
                    Step::Skip(why) => debug!("Event skipped ({})", why),
                    Step::Resubscribe => break,
                }
            }

            debug!("The watch stream has been closed, attempting to recreate the watcher");
        }
    }
}

fn shutdown_flag(rx: &Option<watch::Receiver<bool>>) -> bool {
    rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
}

async fn shutdown_requested(rx: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = rx else {
        return futures::future::pending().await;
    };
    loop {
        let stop = *rx.borrow_and_update();
        if stop {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: nobody can ask us to stop anymore.
            return futures::future::pending().await;
        }
    }
}
