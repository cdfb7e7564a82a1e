//! HCFD poller daemon
//!
//! Commands:
//! - `run` (default) - poll both feeds every interval until Ctrl+C
//! - `once` - run a single cycle and exit
//! - `reset-tokens` - forget processed change tokens
//! - `subscribers` - print the subscriber count

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::{error, info};

use hcfd_config::{AppConfig, LogFormat};
use hcfd_core::{FeedSource, SystemClock};
use hcfd_daemon::admin;
use hcfd_daemon::wiring::{build_cycle, build_gateway, build_telemetry, connect_store};
use hcfd_daemon::PollScheduler;

#[tokio::main]
async fn main() -> Result<()> {
    let command = std::env::args().nth(1).unwrap_or_else(|| "run".to_string());

    let config = AppConfig::load().context("Failed to load configuration")?;
    hcfd_obs::init("hcfd-forecast", config.log.format == LogFormat::Json);

    info!("Starting HCFD poller");
    info!(
        rainfall_targets = ?config.rainfall.targets,
        hazard_targets = ?config.hazard.targets,
        interval_secs = config.poll.interval_secs,
        gateway = ?config.gateway.kind,
        store = ?config.store.kind,
        "Loaded configuration"
    );

    let store = connect_store(&config.store).await?;

    match command.as_str() {
        "run" | "once" => {
            let telemetry = build_telemetry(&config.feed)?;
            let gateway = build_gateway(&config.gateway)?;
            let cycle = build_cycle(&config, telemetry, store, gateway, Arc::new(SystemClock))?;
            let scheduler = PollScheduler::new(cycle, config.poll_interval());

            if command == "once" {
                let report = scheduler.run_cycle().await;
                info!(?report, "Single cycle complete");
                return Ok(());
            }

            info!(
                interval_secs = scheduler.interval().as_secs(),
                "Daemon running - press Ctrl+C to stop"
            );
            let handle = scheduler.start();

            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            } else {
                info!("Shutdown signal received");
            }

            let cycles = handle.stop().await?;
            info!(cycles, "HCFD poller stopped");
        }
        "reset-tokens" => {
            admin::reset_tokens(store.as_ref(), &FeedSource::ALL)
                .await
                .context("Failed to reset change tokens")?;
            println!("Change tokens reset for rainfall and hazard feeds");
        }
        "subscribers" => {
            let count = admin::subscriber_count(store.as_ref())
                .await
                .context("Failed to count subscribers")?;
            println!("{}", count);
        }
        other => bail!(
            "Unknown command '{}'; expected run, once, reset-tokens or subscribers",
            other
        ),
    }

    Ok(())
}
