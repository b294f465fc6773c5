//! Supervisor task submission records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Side, Venue};

/// Everything a supervisor task needs to resume monitoring a position.
///
/// Persisted into the durable queue on submission; the queue, not process
/// memory, is the source of truth for which positions need monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub symbol: String,
    pub quantity: Decimal,
    pub venue: Venue,
    pub side: Side,
    pub entry_order_id: String,
    /// Trailing trigger threshold, in percent (e.g. `1.5`).
    pub trigger_pct: Decimal,
    pub strategy_id: String,
}

impl TaskSpec {
    pub fn new(
        symbol: impl Into<String>,
        quantity: Decimal,
        venue: Venue,
        side: Side,
        entry_order_id: impl Into<String>,
        trigger_pct: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            venue,
            side,
            entry_order_id: entry_order_id.into(),
            trigger_pct,
            strategy_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_strategy_id(mut self, strategy_id: impl Into<String>) -> Self {
        self.strategy_id = strategy_id.into();
        self
    }
}
