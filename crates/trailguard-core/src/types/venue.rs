//! Supported brokerage venues.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A brokerage venue the engine can execute against.
///
/// Unknown venue names fail deserialization at config load; there is no
/// silent default venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Venue {
    Alpaca,
    Oanda,
    Binance,
    Bybit,
    Coinbase,
    Fxcm,
    #[serde(alias = "ibr")]
    InteractiveBrokers,
}

impl Venue {
    /// All known venues, in a stable order.
    pub const ALL: [Venue; 7] = [
        Venue::Alpaca,
        Venue::Oanda,
        Venue::Binance,
        Venue::Bybit,
        Venue::Coinbase,
        Venue::Fxcm,
        Venue::InteractiveBrokers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Alpaca => "alpaca",
            Venue::Oanda => "oanda",
            Venue::Binance => "binance",
            Venue::Bybit => "bybit",
            Venue::Coinbase => "coinbase",
            Venue::Fxcm => "fxcm",
            Venue::InteractiveBrokers => "interactive_brokers",
        }
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Venue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alpaca" => Ok(Venue::Alpaca),
            "oanda" => Ok(Venue::Oanda),
            "binance" => Ok(Venue::Binance),
            "bybit" => Ok(Venue::Bybit),
            "coinbase" => Ok(Venue::Coinbase),
            "fxcm" => Ok(Venue::Fxcm),
            "interactive_brokers" | "ibr" => Ok(Venue::InteractiveBrokers),
            other => Err(format!("unknown venue: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for venue in Venue::ALL {
            assert_eq!(venue.as_str().parse::<Venue>().unwrap(), venue);
        }
    }

    #[test]
    fn test_ibr_alias() {
        assert_eq!("ibr".parse::<Venue>().unwrap(), Venue::InteractiveBrokers);
    }

    #[test]
    fn test_unknown_rejected() {
        assert!("robinhood".parse::<Venue>().is_err());
    }
}
