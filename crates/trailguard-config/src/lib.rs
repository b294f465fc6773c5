//! Configuration management.

mod settings;

pub use settings::{
    AlertSettings, AlpacaSettings, AppConfig, AppSettings, BinanceSettings, LoggingConfig,
    OandaSettings, StoreSettings, VenueSettings,
};

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use std::path::Path;
use trailguard_core::error::TrailguardError;

/// Load configuration from file and environment.
///
/// Environment variables prefixed `TRAILGUARD__` override file values, e.g.
/// `TRAILGUARD__SUPERVISOR__POLL_INTERVAL_SECS=5`.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("TRAILGUARD")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize()
}

/// Reject configurations the engine cannot run with.
pub fn validate(config: &AppConfig) -> Result<(), TrailguardError> {
    if config.supervisor.workers == 0 {
        return Err(TrailguardError::Validation(
            "supervisor.workers must be at least 1".into(),
        ));
    }
    if config.supervisor.max_attempts == 0 {
        return Err(TrailguardError::Validation(
            "supervisor.max_attempts must be at least 1".into(),
        ));
    }
    if config.risk.trailing_pct <= Decimal::ZERO {
        return Err(TrailguardError::Validation(
            "risk.trailing_pct must be positive".into(),
        ));
    }
    if config.risk.atr_period == 0 {
        return Err(TrailguardError::Validation(
            "risk.atr_period must be at least 1".into(),
        ));
    }
    if config.allocator.top_n == 0 {
        return Err(TrailguardError::Validation(
            "allocator.top_n must be at least 1".into(),
        ));
    }
    if config.allocator.min_confidence < Decimal::ZERO || config.allocator.min_confidence > Decimal::ONE {
        return Err(TrailguardError::Validation(
            "allocator.min_confidence must be within [0, 1]".into(),
        ));
    }
    if !config.venues.paper_only && config.configured_venues().is_empty() {
        return Err(TrailguardError::Validation(
            "no venue configured; add a [venues.*] section or set venues.paper_only".into(),
        ));
    }
    Ok(())
}
