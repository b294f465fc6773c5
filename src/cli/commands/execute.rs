//! Execute command: place a risk-managed entry order.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;
use tracing::{info, warn};
use trailguard_broker::VenueMetadata;
use trailguard_config::load_config;
use trailguard_core::traits::{BrokerGateway, PersistenceStore};
use trailguard_core::types::{Candle, MarginMode, OrderRequest, RiskLevels, Side, TaskSpec};
use trailguard_risk::RiskEngine;

use crate::cli::{wiring, ExecuteArgs};

pub async fn run(args: ExecuteArgs, config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    trailguard_config::validate(&config)?;

    let registry = wiring::build_registry(&config)?;
    let store = wiring::build_store(&config).await?;
    let gateway = registry.get(args.venue)?;

    let side: Side = args.side.into();
    let metadata = VenueMetadata::for_venue(args.venue);

    let leverage = args.leverage.map(|requested| {
        let clamped = metadata.clamp_leverage(requested);
        if clamped != requested {
            warn!(
                "requested leverage {requested}x exceeds the {} maximum; using {clamped}x",
                args.venue
            );
        }
        clamped
    });

    let candles: Vec<Candle> = match &args.candles {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {path:?}"))?;
            serde_json::from_str(&raw).context("candle file is not a JSON array of candles")?
        }
        None => Vec::new(),
    };

    let risk = RiskEngine::new(config.risk.clone());
    let levels = risk.static_levels_from_history(
        args.price,
        side,
        &candles,
        leverage.unwrap_or(rust_decimal::Decimal::ONE),
    );

    info!(
        "entry {} {} {} @ ~{}: SL {}, TP {}",
        side, args.quantity, args.symbol, args.price, levels.static_sl, levels.static_tp
    );

    let mut request = OrderRequest::market(args.symbol.clone(), side, args.quantity)
        .with_stop_loss(levels.static_sl)
        .with_take_profit(levels.static_tp);
    if let Some(leverage) = leverage {
        request = request.with_leverage(leverage, MarginMode::Isolated);
    }

    let result = gateway.place_order(request).await?;
    println!(
        "Order {} submitted on {} ({:?})",
        result.order_id, args.venue, result.status
    );

    let spec = TaskSpec::new(
        args.symbol.clone(),
        args.quantity,
        args.venue,
        side,
        result.order_id.clone(),
        risk.trailing_pct(),
    );

    store
        .save_risk_levels(&RiskLevels {
            symbol: args.symbol.clone(),
            entry_price: args.price,
            static_sl: levels.static_sl,
            static_tp: levels.static_tp,
            trailing_sl: levels.static_sl,
            timestamp: Utc::now(),
            strategy_id: spec.strategy_id.clone(),
        })
        .await?;

    if args.trail {
        // The queue is durable: the run daemon picks this up on recovery.
        store.put_task(&spec).await?;
        println!(
            "Trailing supervision queued as {} (start `trailguard run` to supervise)",
            spec.strategy_id
        );
    }

    Ok(())
}
