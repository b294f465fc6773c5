//! Candidate filtering, scoring, diversification, and capital split.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use trailguard_core::types::{AllocatedTrade, Candidate};

/// Capital amounts are quoted to the cent.
const CAPITAL_DP: u32 = 2;

/// How capital is split across selected candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMethod {
    /// Even split of the budget.
    Equal,
    /// Split proportional to each candidate's score.
    #[default]
    ScoreWeighted,
}

/// Attribute used to cap concentration within the selected set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiversifyBy {
    #[default]
    AssetType,
    Ticker,
}

/// Allocator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Maximum number of trades to fund.
    pub top_n: usize,
    /// Candidates below this confidence are dropped.
    pub min_confidence: Decimal,
    /// Drop candidates flagged as bankrupt.
    pub exclude_bankrupt: bool,
    pub diversify_by: DiversifyBy,
    pub method: AllocationMethod,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            min_confidence: dec!(0.6),
            exclude_bankrupt: true,
            diversify_by: DiversifyBy::AssetType,
            method: AllocationMethod::ScoreWeighted,
        }
    }
}

/// Select and size trades from a candidate list.
///
/// Deterministic and side-effect free:
/// 1. filter by confidence and the bankruptcy flag;
/// 2. score `confidence * expected_profit` (missing profit counts as 1);
/// 3. stable sort descending, so ties keep input order;
/// 4. keep the first candidate per diversification key, at most `top_n`;
/// 5. split `total_capital` by the configured method.
///
/// An empty filtered set yields an empty result, not an error.
pub fn allocate(
    candidates: &[Candidate],
    total_capital: Decimal,
    config: &AllocatorConfig,
) -> Vec<AllocatedTrade> {
    let mut scored: Vec<(Candidate, Decimal)> = candidates
        .iter()
        .filter(|c| c.confidence >= config.min_confidence)
        .filter(|c| !(config.exclude_bankrupt && c.is_bankrupt))
        .map(|c| {
            let score = c.confidence * c.expected_profit.unwrap_or(Decimal::ONE);
            (c.clone(), score)
        })
        .collect();

    // Stable: equal scores keep candidate input order, so results are
    // reproducible run to run.
    scored.sort_by(|a, b| b.1.cmp(&a.1));

    let mut seen_keys: HashSet<String> = HashSet::new();
    let mut selected: Vec<(Candidate, Decimal)> = Vec::new();
    for (candidate, score) in scored {
        if selected.len() >= config.top_n {
            break;
        }
        let key = match config.diversify_by {
            DiversifyBy::AssetType => candidate.asset_type.clone(),
            DiversifyBy::Ticker => candidate.ticker.clone(),
        };
        if seen_keys.insert(key) {
            selected.push((candidate, score));
        }
    }

    if selected.is_empty() {
        return Vec::new();
    }

    let count = Decimal::from(selected.len() as u64);
    let total_score: Decimal = selected.iter().map(|(_, score)| *score).sum();

    selected
        .into_iter()
        .map(|(candidate, score)| {
            let allocated_capital = match config.method {
                AllocationMethod::Equal => round_capital(total_capital / count),
                AllocationMethod::ScoreWeighted => {
                    // Zero total score degrades to equal weights.
                    let weight = if total_score.is_zero() {
                        Decimal::ONE / count
                    } else {
                        score / total_score
                    };
                    round_capital(weight * total_capital)
                }
            };
            AllocatedTrade {
                candidate,
                score,
                allocated_capital,
            }
        })
        .collect()
}

fn round_capital(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CAPITAL_DP, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(
        ticker: &str,
        asset_type: &str,
        confidence: Decimal,
        expected_profit: Option<Decimal>,
    ) -> Candidate {
        Candidate {
            ticker: ticker.to_string(),
            asset_type: asset_type.to_string(),
            confidence,
            expected_profit,
            is_bankrupt: false,
        }
    }

    #[test]
    fn test_filters_low_confidence_and_bankrupt() {
        let mut broke = candidate("XYZ", "stocks", dec!(0.9), None);
        broke.is_bankrupt = true;
        let candidates = vec![
            candidate("AAA", "stocks", dec!(0.5), None),
            candidate("BBB", "crypto", dec!(0.8), None),
            broke,
        ];

        let trades = allocate(&candidates, dec!(1000), &AllocatorConfig::default());
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].candidate.ticker, "BBB");
    }

    #[test]
    fn test_bankrupt_kept_when_not_excluded() {
        let mut broke = candidate("XYZ", "stocks", dec!(0.9), None);
        broke.is_bankrupt = true;

        let config = AllocatorConfig {
            exclude_bankrupt: false,
            ..AllocatorConfig::default()
        };
        let trades = allocate(&[broke], dec!(1000), &config);
        assert_eq!(trades.len(), 1);
    }

    #[test]
    fn test_score_and_ordering() {
        let candidates = vec![
            candidate("LOW", "stocks", dec!(0.7), Some(dec!(1))),
            candidate("HIGH", "crypto", dec!(0.8), Some(dec!(3))),
        ];

        let trades = allocate(&candidates, dec!(1000), &AllocatorConfig::default());
        assert_eq!(trades[0].candidate.ticker, "HIGH");
        assert_eq!(trades[0].score, dec!(2.4));
        assert_eq!(trades[1].score, dec!(0.7));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let candidates = vec![
            candidate("FIRST", "stocks", dec!(0.8), None),
            candidate("SECOND", "crypto", dec!(0.8), None),
        ];

        let trades = allocate(&candidates, dec!(1000), &AllocatorConfig::default());
        assert_eq!(trades[0].candidate.ticker, "FIRST");
        assert_eq!(trades[1].candidate.ticker, "SECOND");
    }

    #[test]
    fn test_diversification_one_per_asset_type() {
        let candidates = vec![
            candidate("BTC", "crypto", dec!(0.95), None),
            candidate("ETH", "crypto", dec!(0.9), None),
            candidate("AAPL", "stocks", dec!(0.85), None),
        ];

        let trades = allocate(&candidates, dec!(1000), &AllocatorConfig::default());
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].candidate.ticker, "BTC");
        assert_eq!(trades[1].candidate.ticker, "AAPL");
    }

    #[test]
    fn test_top_n_cap() {
        let candidates: Vec<Candidate> = (0..10)
            .map(|i| candidate(&format!("T{i}"), &format!("type{i}"), dec!(0.9), None))
            .collect();

        let config = AllocatorConfig {
            top_n: 3,
            ..AllocatorConfig::default()
        };
        let trades = allocate(&candidates, dec!(1000), &config);
        assert_eq!(trades.len(), 3);
    }

    #[test]
    fn test_equal_split() {
        let candidates = vec![
            candidate("A", "t1", dec!(0.9), None),
            candidate("B", "t2", dec!(0.8), None),
            candidate("C", "t3", dec!(0.7), None),
        ];

        let config = AllocatorConfig {
            method: AllocationMethod::Equal,
            ..AllocatorConfig::default()
        };
        let trades = allocate(&candidates, dec!(1000), &config);
        for trade in &trades {
            assert_eq!(trade.allocated_capital, dec!(333.33));
        }
    }

    #[test]
    fn test_score_weighted_sums_to_budget() {
        let candidates = vec![
            candidate("A", "t1", dec!(0.9), Some(dec!(2))),
            candidate("B", "t2", dec!(0.6), Some(dec!(1))),
            candidate("C", "t3", dec!(0.8), Some(dec!(1.5))),
        ];

        let total = dec!(10000);
        let trades = allocate(&candidates, total, &AllocatorConfig::default());
        let sum: Decimal = trades.iter().map(|t| t.allocated_capital).sum();

        // Within one cent per trade of the budget.
        let epsilon = dec!(0.01) * Decimal::from(trades.len() as u64);
        assert!((sum - total).abs() <= epsilon, "sum {sum} vs total {total}");
    }

    #[test]
    fn test_zero_total_score_equal_weights() {
        let candidates = vec![
            candidate("A", "t1", dec!(0.9), Some(dec!(0))),
            candidate("B", "t2", dec!(0.8), Some(dec!(0))),
        ];

        let trades = allocate(&candidates, dec!(100), &AllocatorConfig::default());
        assert_eq!(trades[0].allocated_capital, dec!(50.00));
        assert_eq!(trades[1].allocated_capital, dec!(50.00));
    }

    #[test]
    fn test_empty_input() {
        let trades = allocate(&[], dec!(1000), &AllocatorConfig::default());
        assert!(trades.is_empty());
    }
}
