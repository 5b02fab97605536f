//! powseal-daemon: runs the sealing engine over a synthetic chain.
//!
//! Seals blocks back to back until interrupted with Ctrl-C. On Unix, SIGHUP
//! reloads the configuration file and applies the worker count and tiers.

mod chain;
mod config;
mod events;

use std::sync::Arc;

use powseal_pow::difficulty::BoundedAdjustment;
use powseal_pow::{stop_channel, Sealer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::chain::ChainRunner;
use crate::config::DaemonConfig;
use crate::events::{EventBus, EventKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // 2. Initialize tracing
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("powseal={}", config.advanced.log_level).parse()?);
    if config.advanced.log_file.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.advanced.log_file)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    }

    info!("Powseal daemon starting");

    // 3. Build the engine
    let sealer = Arc::new(Sealer::from_config(config.sealer.clone()));
    let event_bus = EventBus::new(1000);
    let runner = Arc::new(ChainRunner::new(
        sealer.clone(),
        BoundedAdjustment::new(config.adjustment),
        config.work.clone(),
        event_bus.clone(),
    )?);

    // 4. Log events
    let mut events = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => info!(sequence = event.sequence, event = %json, "Event"),
                    Err(e) => warn!(error = %e, "Failed to encode event"),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event logger lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    event_bus.emit(EventKind::DaemonStarted {
        version: env!("CARGO_PKG_VERSION").to_string(),
    });

    // 5. Stop on Ctrl-C
    let (stop_handle, stop) = stop_channel();
    {
        let stop_handle = stop_handle.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                return;
            }
            info!("Ctrl-C received, shutting down");
            stop_handle.stop();
        });
    }

    // 6. Reload on SIGHUP
    #[cfg(unix)]
    {
        let sealer = sealer.clone();
        let runner = runner.clone();
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};
            let mut hangup = match signal(SignalKind::hangup()) {
                Ok(hangup) => hangup,
                Err(e) => {
                    warn!("Failed to listen for SIGHUP: {}", e);
                    return;
                }
            };
            while hangup.recv().await.is_some() {
                match DaemonConfig::load() {
                    Ok(reloaded) => {
                        info!(threads = reloaded.sealer.threads, "Configuration reloaded");
                        sealer.set_threads(reloaded.sealer.threads);
                        runner.set_tiers(&reloaded.work.tiers);
                    }
                    Err(e) => warn!("Failed to reload configuration: {}", e),
                }
            }
        });
    }

    // 7. Seal until stopped
    let sealed = runner.run(&stop).await?;
    stop_handle.stop();

    info!(sealed, total_hashes = sealer.meter().count(), "Daemon stopped");
    Ok(())
}
