use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use crashwatch::cli::Args;
use crashwatch::config::load_config;
use crashwatch::kubernetes::{connect, KubePodEvents};
use crashwatch::notify::Notifier;
use crashwatch::watcher::{AlertPipeline, Watcher};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = load_config(args.config_path()).context("error loading config")?;
    init_tracing(cfg.debug);
    info!(
        "namespace = {}, quiet window = {}m, time zone = {}",
        cfg.namespace, cfg.quiet_window_minutes, cfg.time_zone
    );

    let notifier = Notifier::initialize(&cfg.notification)
        .context("error preparing notification handler")?;
    let client = connect().await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let source = KubePodEvents::new(client, &cfg.namespace);
    let pipeline = AlertPipeline::from_config(notifier, &cfg);
    let mut watcher =
        Watcher::new(source, pipeline, cfg.self_name.clone()).with_shutdown(shutdown_rx);

    let mut task = tokio::spawn(async move { watcher.run().await });

    tokio::select! {
        res = &mut task => {
            return res.context("watch task panicked")?;
        }
        _ = shutdown_signal() => {
            info!("Termination signal received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    }

    // Lets an in-flight notification finish before exiting.
    match task.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!("Watcher stopped with an error: {:#}", e);
            Err(e)
        }
        Err(e) => Err(e).context("watch task panicked"),
    }
}

fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Unable to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
