//! Construction of the runtime pieces from configuration.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use trailguard_broker::{
    AlpacaConfig, AlpacaGateway, BinanceConfig, BinanceGateway, GatewayRegistry, OandaConfig,
    OandaGateway, PaperGateway,
};
use trailguard_config::AppConfig;
use trailguard_core::traits::{AlertSink, PersistenceStore};
use trailguard_core::types::Venue;
use trailguard_monitor::{LogAlerts, WebhookAlerts};
use trailguard_store::JsonlStore;

fn env_var(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("environment variable {name} not set"))
}

/// Build the gateway registry from the configured venue sections.
pub fn build_registry(config: &AppConfig) -> Result<GatewayRegistry> {
    let mut registry = GatewayRegistry::new();

    if config.venues.paper_only {
        for venue in [Venue::Alpaca, Venue::Oanda, Venue::Binance] {
            registry.register(Arc::new(PaperGateway::new(venue)));
        }
        return Ok(registry);
    }

    if let Some(settings) = &config.venues.alpaca {
        let gateway = AlpacaGateway::new(AlpacaConfig::new(
            env_var(&settings.api_key_env)?,
            env_var(&settings.api_secret_env)?,
            settings.paper,
        ))?;
        registry.register(Arc::new(gateway));
    }
    if let Some(settings) = &config.venues.oanda {
        let gateway = OandaGateway::new(OandaConfig::new(
            env_var(&settings.api_key_env)?,
            env_var(&settings.account_id_env)?,
            settings.practice,
        ))?;
        registry.register(Arc::new(gateway));
    }
    if let Some(settings) = &config.venues.binance {
        let gateway = BinanceGateway::new(BinanceConfig::new(
            env_var(&settings.api_key_env)?,
            env_var(&settings.api_secret_env)?,
        ))?;
        registry.register(Arc::new(gateway));
    }

    if registry.is_empty() {
        bail!("no venue configured; add a [venues.*] section or set venues.paper_only");
    }
    Ok(registry)
}

pub async fn build_store(config: &AppConfig) -> Result<Arc<dyn PersistenceStore>> {
    let store = JsonlStore::open(config.store.data_dir.clone())
        .await
        .with_context(|| format!("failed to open store at {}", config.store.data_dir))?;
    Ok(Arc::new(store))
}

pub fn build_alerts(config: &AppConfig) -> Arc<dyn AlertSink> {
    match &config.alerts.webhook_url {
        Some(url) => Arc::new(WebhookAlerts::new(url)),
        None => Arc::new(LogAlerts),
    }
}
