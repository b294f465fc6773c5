//! Average True Range.

use rust_decimal::Decimal;
use trailguard_core::error::RiskError;
use trailguard_core::types::Candle;

/// Average True Range (ATR).
///
/// Measures market volatility by decomposing the entire range of an asset
/// price over the lookback period. Common period is 14.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Latest ATR value over the given bars, using Wilder's smoothing.
    ///
    /// Needs `period + 1` bars (true range requires the previous close);
    /// fewer bars is an [`RiskError::InsufficientHistory`] which callers
    /// resolve by falling back to percentage-based levels.
    pub fn compute(&self, candles: &[Candle]) -> Result<Decimal, RiskError> {
        let required = self.period + 1;
        if candles.len() < required {
            return Err(RiskError::InsufficientHistory {
                required,
                available: candles.len(),
            });
        }

        let mut true_ranges = Vec::with_capacity(candles.len() - 1);
        for pair in candles.windows(2) {
            let prev_close = pair[0].close;
            let bar = &pair[1];
            let high_low = bar.high - bar.low;
            let high_close = (bar.high - prev_close).abs();
            let low_close = (bar.low - prev_close).abs();
            true_ranges.push(high_low.max(high_close).max(low_close));
        }

        let period = Decimal::from(self.period as u64);

        // Initial ATR is the simple average of the first `period` true
        // ranges, then Wilder's smoothing over the remainder.
        let mut atr: Decimal =
            true_ranges[..self.period].iter().copied().sum::<Decimal>() / period;
        for tr in &true_ranges[self.period..] {
            atr = (atr * (period - Decimal::ONE) + *tr) / period;
        }

        Ok(atr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn candle(high: Decimal, low: Decimal, close: Decimal) -> Candle {
        Candle::new(Utc::now(), close, high, low, close)
    }

    #[test]
    fn test_insufficient_history() {
        let atr = Atr::new(14);
        let bars: Vec<Candle> = (0..10).map(|_| candle(dec!(11), dec!(9), dec!(10))).collect();

        let err = atr.compute(&bars).unwrap_err();
        match err {
            RiskError::InsufficientHistory { required, available } => {
                assert_eq!(required, 15);
                assert_eq!(available, 10);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_constant_range() {
        // Every bar spans exactly 2.0 and closes mid-range, so every true
        // range is 2.0 and the smoothed ATR stays there.
        let atr = Atr::new(3);
        let bars: Vec<Candle> = (0..8).map(|_| candle(dec!(11), dec!(9), dec!(10))).collect();

        assert_eq!(atr.compute(&bars).unwrap(), dec!(2));
    }

    #[test]
    fn test_gap_widens_atr() {
        let atr = Atr::new(2);
        let bars = vec![
            candle(dec!(101), dec!(99), dec!(100)),
            candle(dec!(101), dec!(99), dec!(100)),
            candle(dec!(101), dec!(99), dec!(100)),
            // Gap up: true range driven by distance from previous close.
            candle(dec!(111), dec!(109), dec!(110)),
        ];

        let value = atr.compute(&bars).unwrap();
        assert!(value > dec!(2), "gap should widen ATR, got {value}");
    }
}
