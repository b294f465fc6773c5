//! Close-all command: flatten every open position.
//!
//! Operator escape hatch for abandoned positions: walks every configured
//! venue, places opposite-side market orders, and drains the pending
//! supervision queue.

use anyhow::Result;
use std::path::Path;
use tracing::{error, info};
use trailguard_config::load_config;
use trailguard_core::traits::{AlertSink, BrokerGateway, FeedbackOutcome, PersistenceStore, Severity};
use trailguard_core::types::OrderRequest;

use crate::cli::{wiring, CloseAllArgs};

pub async fn run(args: CloseAllArgs, config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    trailguard_config::validate(&config)?;

    let registry = wiring::build_registry(&config)?;
    let store = wiring::build_store(&config).await?;
    let alerts = wiring::build_alerts(&config);

    let mut closed = 0usize;
    let mut failed = 0usize;

    for venue in registry.venues() {
        let gateway = registry.get(venue)?;
        let positions = match gateway.get_all_positions().await {
            Ok(positions) => positions,
            Err(err) => {
                error!("failed to list positions on {venue}: {err}");
                failed += 1;
                continue;
            }
        };

        for position in positions {
            println!(
                "{venue}: {} {} {} @ {}",
                position.side, position.quantity, position.symbol, position.entry_price
            );
            if args.dry_run {
                continue;
            }

            let request = OrderRequest::market(
                position.symbol.clone(),
                position.side.opposite(),
                position.quantity,
            );
            match gateway.place_order(request).await {
                Ok(result) => {
                    info!(
                        "closed {} on {venue} with order {}",
                        position.symbol, result.order_id
                    );
                    closed += 1;
                }
                Err(err) => {
                    error!("failed to close {} on {venue}: {err}", position.symbol);
                    failed += 1;
                }
            }
        }
    }

    if args.dry_run {
        println!("Dry run: no orders placed.");
        return Ok(());
    }

    // Supervisors for these positions have nothing left to watch.
    for spec in store.pending_tasks().await? {
        store
            .record_feedback(
                &spec.strategy_id,
                FeedbackOutcome::Failure,
                "supervision cancelled by close-all",
            )
            .await?;
        store.complete_task(&spec.strategy_id).await?;
    }

    alerts
        .notify(
            &format!("close-all finished: {closed} closed, {failed} failed"),
            if failed > 0 {
                Severity::Warning
            } else {
                Severity::Info
            },
            None,
        )
        .await;

    println!("Closed {closed} position(s), {failed} failure(s).");
    Ok(())
}
