//! Order types shared across venue gateways.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buy or sell). A long position is entered with `Buy`,
/// a short with `Sell`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Get the opposite side, used when closing a position.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Whether this side opens a long position.
    pub fn is_long(&self) -> bool {
        matches!(self, Side::Buy)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Margin mode for leveraged venues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarginMode {
    #[default]
    Isolated,
    Cross,
}

/// Order status as reported by a venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Submitted,
    Accepted,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
}

impl OrderStatus {
    /// Check if the order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Canceled
                | OrderStatus::Rejected
                | OrderStatus::Expired
        )
    }

    /// Check if the order can still fill.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::Submitted | OrderStatus::Accepted | OrderStatus::PartiallyFilled
        )
    }
}

/// Request for a new entry or exit order.
///
/// The protective fields are optional legs: venues that support bracket
/// orders attach them to the entry, others receive them as separate
/// contingent orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    /// Static stop-loss price.
    pub stop_loss: Option<Decimal>,
    /// Static take-profit price.
    pub take_profit: Option<Decimal>,
    /// Trailing stop distance, in percent of price.
    pub trailing_stop: Option<Decimal>,
    /// Leverage multiplier, for margin venues.
    pub leverage: Option<Decimal>,
    /// Margin mode, for margin venues.
    pub margin_mode: Option<MarginMode>,
}

impl OrderRequest {
    /// Create a plain market order request.
    pub fn market(symbol: impl Into<String>, side: Side, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            stop_loss: None,
            take_profit: None,
            trailing_stop: None,
            leverage: None,
            margin_mode: None,
        }
    }

    pub fn with_stop_loss(mut self, price: Decimal) -> Self {
        self.stop_loss = Some(price);
        self
    }

    pub fn with_take_profit(mut self, price: Decimal) -> Self {
        self.take_profit = Some(price);
        self
    }

    pub fn with_trailing_stop(mut self, percent: Decimal) -> Self {
        self.trailing_stop = Some(percent);
        self
    }

    pub fn with_leverage(mut self, leverage: Decimal, mode: MarginMode) -> Self {
        self.leverage = Some(leverage);
        self.margin_mode = Some(mode);
        self
    }
}

/// Venue acknowledgement of a placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: String,
    pub status: OrderStatus,
}
