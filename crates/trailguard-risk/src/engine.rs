//! Static stop-loss / take-profit computation.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;
use trailguard_core::types::{Candle, Side};

use crate::volatility::Atr;

/// Price levels are quoted to four decimals.
const LEVEL_DP: u32 = 4;

/// Risk computation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Prefer ATR-derived distances when enough history is available.
    pub use_volatility: bool,
    /// ATR lookback window, in bars.
    pub atr_period: usize,
    /// Stop-loss distance, in ATR multiples.
    pub atr_sl_mult: Decimal,
    /// Take-profit distance, in ATR multiples.
    pub atr_tp_mult: Decimal,
    /// Trailing distance in percent; also drives the percentage fallback.
    pub trailing_pct: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            use_volatility: true,
            atr_period: 14,
            atr_sl_mult: dec!(1),
            atr_tp_mult: dec!(2),
            trailing_pct: dec!(1.5),
        }
    }
}

/// Static protective levels for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticLevels {
    pub static_sl: Decimal,
    pub static_tp: Decimal,
}

/// Pure computation of protective levels from entry context.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    config: RiskConfig,
    atr: Atr,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        let atr = Atr::new(config.atr_period);
        Self { config, atr }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Trailing distance in percent, for seeding the ratchet.
    pub fn trailing_pct(&self) -> Decimal {
        self.config.trailing_pct
    }

    /// Compute static SL/TP from an optional pre-computed ATR.
    ///
    /// Volatility mode applies when enabled and `atr > 0`; otherwise the
    /// percentage fallback. Leverage above 1 divides both distances before
    /// rounding, since margin amplifies price-equivalent risk.
    pub fn static_levels(
        &self,
        entry_price: Decimal,
        side: Side,
        atr: Option<Decimal>,
        leverage: Decimal,
    ) -> StaticLevels {
        let (mut sl_distance, mut tp_distance) = match atr {
            Some(atr) if self.config.use_volatility && atr > Decimal::ZERO => (
                atr * self.config.atr_sl_mult,
                atr * self.config.atr_tp_mult,
            ),
            _ => {
                let pct = self.config.trailing_pct / dec!(100);
                (entry_price * pct, entry_price * pct * dec!(2))
            }
        };

        if leverage > Decimal::ONE {
            sl_distance /= leverage;
            tp_distance /= leverage;
        }

        let (static_sl, static_tp) = match side {
            Side::Buy => (entry_price - sl_distance, entry_price + tp_distance),
            Side::Sell => (entry_price + sl_distance, entry_price - tp_distance),
        };

        StaticLevels {
            static_sl: round_level(static_sl),
            static_tp: round_level(static_tp),
        }
    }

    /// Compute static SL/TP from price history.
    ///
    /// Malformed or short history falls back to percentage mode rather than
    /// failing: an entry must always get protective levels.
    pub fn static_levels_from_history(
        &self,
        entry_price: Decimal,
        side: Side,
        candles: &[Candle],
        leverage: Decimal,
    ) -> StaticLevels {
        let atr = match self.atr.compute(candles) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!("ATR unavailable, using percentage levels: {err}");
                None
            }
        };
        self.static_levels(entry_price, side, atr, leverage)
    }
}

pub(crate) fn round_level(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(LEVEL_DP, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn engine() -> RiskEngine {
        RiskEngine::new(RiskConfig::default())
    }

    #[test]
    fn test_atr_levels_long() {
        let levels = engine().static_levels(dec!(100), Side::Buy, Some(dec!(2)), dec!(1));
        assert_eq!(levels.static_sl, dec!(98.0000));
        assert_eq!(levels.static_tp, dec!(104.0000));
    }

    #[test]
    fn test_atr_levels_short_mirrored() {
        let levels = engine().static_levels(dec!(100), Side::Sell, Some(dec!(2)), dec!(1));
        assert_eq!(levels.static_sl, dec!(102.0000));
        assert_eq!(levels.static_tp, dec!(96.0000));
    }

    #[test]
    fn test_leverage_divides_distances() {
        let levels = engine().static_levels(dec!(100), Side::Buy, Some(dec!(2)), dec!(4));
        assert_eq!(levels.static_sl, dec!(99.5000));
        assert_eq!(levels.static_tp, dec!(101.0000));
    }

    #[test]
    fn test_percentage_fallback() {
        // trailing_pct 1.5 => SL 1.5% below, TP 3% above.
        let levels = engine().static_levels(dec!(100), Side::Buy, None, dec!(1));
        assert_eq!(levels.static_sl, dec!(98.5000));
        assert_eq!(levels.static_tp, dec!(103.0000));
    }

    #[test]
    fn test_zero_atr_falls_back() {
        let with_zero = engine().static_levels(dec!(100), Side::Buy, Some(dec!(0)), dec!(1));
        let fallback = engine().static_levels(dec!(100), Side::Buy, None, dec!(1));
        assert_eq!(with_zero, fallback);
    }

    #[test]
    fn test_volatility_disabled() {
        let config = RiskConfig {
            use_volatility: false,
            ..RiskConfig::default()
        };
        let engine = RiskEngine::new(config);

        let levels = engine.static_levels(dec!(100), Side::Buy, Some(dec!(2)), dec!(1));
        assert_eq!(levels.static_sl, dec!(98.5000));
    }

    #[test]
    fn test_short_history_falls_back() {
        let candles: Vec<Candle> = (0..3)
            .map(|_| Candle::new(Utc::now(), dec!(100), dec!(101), dec!(99), dec!(100)))
            .collect();

        let levels = engine().static_levels_from_history(dec!(100), Side::Buy, &candles, dec!(1));
        assert_eq!(levels.static_sl, dec!(98.5000));
        assert_eq!(levels.static_tp, dec!(103.0000));
    }
}
