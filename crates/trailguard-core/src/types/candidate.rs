//! Candidate trades produced by the signal source.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A candidate trade, consumed once by the allocator.
///
/// Produced externally by the prediction models; the engine treats it as an
/// opaque record and never recomputes its fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub ticker: String,
    pub asset_type: String,
    /// Model confidence in [0, 1].
    pub confidence: Decimal,
    /// Expected profit estimate; absent means unknown.
    #[serde(default)]
    pub expected_profit: Option<Decimal>,
    #[serde(default)]
    pub is_bankrupt: bool,
}

/// A candidate selected for funding, with its score and capital share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocatedTrade {
    pub candidate: Candidate,
    pub score: Decimal,
    pub allocated_capital: Decimal,
}
