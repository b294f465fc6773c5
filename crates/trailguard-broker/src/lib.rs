//! Venue gateway implementations.
//!
//! Each venue gets a REST client implementing [`BrokerGateway`]; the
//! [`GatewayRegistry`] routes orders to the right one by venue. The
//! [`PaperGateway`] backs dry runs and tests without touching a venue.

pub mod alpaca;
pub mod binance;
mod http;
pub mod oanda;
pub mod paper;
pub mod registry;

pub use alpaca::{AlpacaConfig, AlpacaGateway};
pub use binance::{BinanceConfig, BinanceGateway};
pub use oanda::{OandaConfig, OandaGateway};
pub use paper::PaperGateway;
pub use registry::{GatewayRegistry, VenueMetadata};

pub use trailguard_core::traits::BrokerGateway;
