//! Protective price levels.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Protective levels for one supervised position.
///
/// Recomputed on every supervisor poll tick and upserted by `strategy_id`;
/// a persisted record is never mutated retroactively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLevels {
    pub symbol: String,
    pub entry_price: Decimal,
    pub static_sl: Decimal,
    pub static_tp: Decimal,
    pub trailing_sl: Decimal,
    pub timestamp: DateTime<Utc>,
    pub strategy_id: String,
}
