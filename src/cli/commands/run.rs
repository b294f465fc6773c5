//! Run command: the supervision daemon.

use anyhow::Result;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use trailguard_config::load_config;
use trailguard_supervisor::Scheduler;

use crate::cli::wiring;

pub async fn run(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    trailguard_config::validate(&config)?;

    let registry = wiring::build_registry(&config)?;
    let store = wiring::build_store(&config).await?;
    let alerts = wiring::build_alerts(&config);

    info!(
        "supervising on venues: {}",
        registry
            .venues()
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let scheduler = Scheduler::new(
        registry.gateways(),
        store,
        alerts,
        config.risk.clone(),
        config.supervisor.clone(),
    );

    let resumed = scheduler.recover().await?;
    info!("resumed {resumed} pending supervision task(s)");

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested; signalling supervisors");

    let signalled = scheduler.cancel_all().await;
    if signalled > 0 {
        // Give cancelled tasks a moment to confirm flatness and persist.
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
    info!("stopped ({signalled} task(s) signalled)");

    Ok(())
}
