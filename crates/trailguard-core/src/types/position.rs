//! Open position snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Side, Venue};

/// A position open at a venue.
///
/// Exclusively owned by a single supervisor task for its lifetime; no other
/// actor mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub venue: Venue,
    pub side: Side,
    pub quantity: Decimal,
    /// Average entry price.
    pub entry_price: Decimal,
    /// Latest venue-reported price for the instrument.
    pub mark_price: Decimal,
    pub leverage: Decimal,
    /// Set for positions opened by this engine; venue-sourced snapshots of
    /// externally opened positions carry `None`.
    pub strategy_id: Option<String>,
}

impl Position {
    pub fn new(
        symbol: impl Into<String>,
        venue: Venue,
        side: Side,
        quantity: Decimal,
        entry_price: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            venue,
            side,
            quantity,
            entry_price,
            mark_price: entry_price,
            leverage: Decimal::ONE,
            strategy_id: None,
        }
    }

    pub fn with_strategy_id(mut self, strategy_id: impl Into<String>) -> Self {
        self.strategy_id = Some(strategy_id.into());
        self
    }

    pub fn with_leverage(mut self, leverage: Decimal) -> Self {
        self.leverage = leverage;
        self
    }

    pub fn is_long(&self) -> bool {
        self.side == Side::Buy
    }

    /// Unrealized P&L in percent of entry, sign adjusted for side.
    pub fn unrealized_pnl_pct(&self) -> Decimal {
        if self.entry_price.is_zero() {
            return Decimal::ZERO;
        }
        let raw = (self.mark_price - self.entry_price) / self.entry_price * Decimal::from(100);
        if self.is_long() {
            raw
        } else {
            -raw
        }
    }
}
