use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, WatchEvent, WatchParams};
use kube::Client;
use tracing::info;

/// Live sequence of pod change events for one namespace.
pub type PodEventStream<'a> = BoxStream<'a, kube::Result<WatchEvent<Pod>>>;

/// Something that can open a fresh pod event subscription.
///
/// Every call yields a new stream; the caller drops the old one before
/// asking again.
#[async_trait]
pub trait PodEventSource: Send + Sync {
    async fn subscribe<'a>(&'a self) -> Result<PodEventStream<'a>>;
}

/// Pod watch against the cluster API, scoped to a single namespace.
pub struct KubePodEvents {
    api: Api<Pod>,
    params: WatchParams,
    namespace: String,
}

impl KubePodEvents {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            params: WatchParams::default(),
            namespace: namespace.to_string(),
        }
    }
}

#[async_trait]
impl PodEventSource for KubePodEvents {
    async fn subscribe<'a>(&'a self) -> Result<PodEventStream<'a>> {
        let stream = self
            .api
            .watch(&self.params, "0")
            .await
            .with_context(|| {
                format!("Cannot create pod event watcher for namespace {}", self.namespace)
            })?;
        Ok(stream.boxed())
    }
}

/// Cluster client from in-cluster credentials or the local kubeconfig.
pub async fn connect() -> Result<Client> {
    let client = Client::try_default()
        .await
        .context("Can not get kubernetes config")?;
    info!("Kube credentials pulled");
    Ok(client)
}
