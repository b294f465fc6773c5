//! Venue metadata and the gateway registry.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use trailguard_core::error::GatewayError;
use trailguard_core::traits::BrokerGateway;
use trailguard_core::types::Venue;

/// Static trading parameters for a venue.
#[derive(Debug, Clone)]
pub struct VenueMetadata {
    pub venue: Venue,
    pub max_leverage: Decimal,
    pub margin_required: Decimal,
    /// Commission in percent per trade.
    pub commission: Decimal,
    pub asset_types: &'static [&'static str],
}

impl VenueMetadata {
    /// Look up the static metadata for a venue.
    pub fn for_venue(venue: Venue) -> VenueMetadata {
        match venue {
            Venue::Alpaca => VenueMetadata {
                venue,
                max_leverage: dec!(2),
                margin_required: dec!(0.5),
                commission: dec!(0.0),
                asset_types: &["stocks", "ETFs"],
            },
            Venue::Oanda => VenueMetadata {
                venue,
                max_leverage: dec!(50),
                margin_required: dec!(0.02),
                commission: dec!(0.0),
                asset_types: &["forex", "commodities"],
            },
            Venue::InteractiveBrokers => VenueMetadata {
                venue,
                max_leverage: dec!(30),
                margin_required: dec!(0.033),
                commission: dec!(1.0),
                asset_types: &["stocks", "options", "futures", "forex"],
            },
            Venue::Fxcm => VenueMetadata {
                venue,
                max_leverage: dec!(400),
                margin_required: dec!(0.0025),
                commission: dec!(0.0),
                asset_types: &["forex", "CFDs"],
            },
            Venue::Bybit => VenueMetadata {
                venue,
                max_leverage: dec!(100),
                margin_required: dec!(0.01),
                commission: dec!(0.075),
                asset_types: &["crypto"],
            },
            Venue::Binance => VenueMetadata {
                venue,
                max_leverage: dec!(125),
                margin_required: dec!(0.008),
                commission: dec!(0.1),
                asset_types: &["crypto"],
            },
            Venue::Coinbase => VenueMetadata {
                venue,
                max_leverage: dec!(3),
                margin_required: dec!(0.33),
                commission: dec!(1.5),
                asset_types: &["crypto"],
            },
        }
    }

    /// Clamp a requested leverage to what the venue allows.
    pub fn clamp_leverage(&self, requested: Decimal) -> Decimal {
        requested.min(self.max_leverage).max(Decimal::ONE)
    }
}

/// Gateways keyed by venue, validated at construction.
///
/// Routing happens once at registration rather than per order; requesting
/// a venue that was never configured is a hard error, not a fallback.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: HashMap<Venue, Arc<dyn BrokerGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gateway under its own venue.
    pub fn register(&mut self, gateway: Arc<dyn BrokerGateway>) {
        self.gateways.insert(gateway.venue(), gateway);
    }

    pub fn get(&self, venue: Venue) -> Result<Arc<dyn BrokerGateway>, GatewayError> {
        self.gateways.get(&venue).cloned().ok_or_else(|| {
            GatewayError::Configuration(format!("no gateway configured for venue {venue}"))
        })
    }

    pub fn contains(&self, venue: Venue) -> bool {
        self.gateways.contains_key(&venue)
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }

    /// Configured venues, in registry order.
    pub fn venues(&self) -> Vec<Venue> {
        self.gateways.keys().copied().collect()
    }

    /// Shared map of all gateways, for schedulers that route per task.
    pub fn gateways(&self) -> HashMap<Venue, Arc<dyn BrokerGateway>> {
        self.gateways.clone()
    }
}
