//! Configuration structures.

use serde::{Deserialize, Serialize};
use trailguard_allocator::AllocatorConfig;
use trailguard_core::types::Venue;
use trailguard_risk::RiskConfig;
use trailguard_supervisor::SupervisorSettings;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub venues: VenueSettings,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub supervisor: SupervisorSettings,
    #[serde(default)]
    pub allocator: AllocatorConfig,
    #[serde(default)]
    pub alerts: AlertSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

impl AppConfig {
    /// Venues with a credentials section present, in declaration order.
    pub fn configured_venues(&self) -> Vec<Venue> {
        let mut venues = Vec::new();
        if self.venues.alpaca.is_some() {
            venues.push(Venue::Alpaca);
        }
        if self.venues.oanda.is_some() {
            venues.push(Venue::Oanda);
        }
        if self.venues.binance.is_some() {
            venues.push(Venue::Binance);
        }
        venues
    }
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "trailguard".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Per-venue credential sections. A venue with no section is not wired into
/// the gateway registry.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VenueSettings {
    pub alpaca: Option<AlpacaSettings>,
    pub oanda: Option<OandaSettings>,
    pub binance: Option<BinanceSettings>,
    /// Route all orders to the in-memory paper gateway instead of live
    /// venues.
    #[serde(default)]
    pub paper_only: bool,
}

/// Alpaca credential settings. Keys come from the named environment
/// variables, never the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlpacaSettings {
    pub api_key_env: String,
    pub api_secret_env: String,
    pub paper: bool,
}

impl Default for AlpacaSettings {
    fn default() -> Self {
        Self {
            api_key_env: "ALPACA_API_KEY".to_string(),
            api_secret_env: "ALPACA_API_SECRET".to_string(),
            paper: true,
        }
    }
}

/// OANDA credential settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OandaSettings {
    pub api_key_env: String,
    pub account_id_env: String,
    pub practice: bool,
}

impl Default for OandaSettings {
    fn default() -> Self {
        Self {
            api_key_env: "OANDA_API_KEY".to_string(),
            account_id_env: "OANDA_ACCOUNT_ID".to_string(),
            practice: true,
        }
    }
}

/// Binance credential settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinanceSettings {
    pub api_key_env: String,
    pub api_secret_env: String,
}

impl Default for BinanceSettings {
    fn default() -> Self {
        Self {
            api_key_env: "BINANCE_API_KEY".to_string(),
            api_secret_env: "BINANCE_SECRET_KEY".to_string(),
        }
    }
}

/// Outbound alert settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AlertSettings {
    /// Webhook to POST alert payloads to; log-only when absent.
    pub webhook_url: Option<String>,
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Directory for the append-only JSONL files.
    pub data_dir: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}
