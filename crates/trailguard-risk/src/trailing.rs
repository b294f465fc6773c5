//! Trailing-stop ratchet.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use trailguard_core::types::Side;

use crate::engine::round_level;

/// The trailing-stop ratchet for one position.
///
/// `best_price` is monotone: non-decreasing for longs, non-increasing for
/// shorts. The stop level derived from it therefore never moves against the
/// position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailingStop {
    side: Side,
    best_price: Decimal,
    /// Trailing distance in percent.
    trail_pct: Decimal,
}

impl TrailingStop {
    pub fn new(entry_price: Decimal, side: Side, trail_pct: Decimal) -> Self {
        Self {
            side,
            best_price: entry_price,
            trail_pct,
        }
    }

    pub fn best_price(&self) -> Decimal {
        self.best_price
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Ratchet on a new price observation and return the updated stop level.
    pub fn observe(&mut self, price: Decimal) -> Decimal {
        self.best_price = match self.side {
            Side::Buy => self.best_price.max(price),
            Side::Sell => self.best_price.min(price),
        };
        self.stop_level()
    }

    /// Current stop level: `best * (1 - trail_pct/100)` for longs, mirrored
    /// for shorts.
    pub fn stop_level(&self) -> Decimal {
        let fraction = self.trail_pct / dec!(100);
        let level = match self.side {
            Side::Buy => self.best_price * (Decimal::ONE - fraction),
            Side::Sell => self.best_price * (Decimal::ONE + fraction),
        };
        round_level(level)
    }

    /// Whether the given price crosses the stop level.
    pub fn is_triggered(&self, price: Decimal) -> bool {
        match self.side {
            Side::Buy => price <= self.stop_level(),
            Side::Sell => price >= self.stop_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_price_monotonic_long() {
        let mut stop = TrailingStop::new(dec!(100), Side::Buy, dec!(2));

        let prices = [dec!(100), dec!(105), dec!(103), dec!(108), dec!(95)];
        let expected = [dec!(100), dec!(105), dec!(105), dec!(108), dec!(108)];

        for (price, best) in prices.iter().zip(expected.iter()) {
            stop.observe(*price);
            assert_eq!(stop.best_price(), *best);
        }
    }

    #[test]
    fn test_best_price_monotonic_short() {
        let mut stop = TrailingStop::new(dec!(100), Side::Sell, dec!(2));

        stop.observe(dec!(95));
        assert_eq!(stop.best_price(), dec!(95));
        stop.observe(dec!(98));
        assert_eq!(stop.best_price(), dec!(95));
        stop.observe(dec!(90));
        assert_eq!(stop.best_price(), dec!(90));
    }

    #[test]
    fn test_stop_level_never_relaxes_long() {
        let mut stop = TrailingStop::new(dec!(100), Side::Buy, dec!(2));
        let mut last_level = stop.stop_level();

        for price in [dec!(101), dec!(105), dec!(99), dec!(110), dec!(100)] {
            let level = stop.observe(price);
            assert!(level >= last_level, "stop relaxed: {level} < {last_level}");
            last_level = level;
        }
    }

    #[test]
    fn test_trigger_long() {
        let mut stop = TrailingStop::new(dec!(100), Side::Buy, dec!(2));
        stop.observe(dec!(110));
        // Stop sits at 110 * 0.98 = 107.8.
        assert_eq!(stop.stop_level(), dec!(107.8000));
        assert!(!stop.is_triggered(dec!(108)));
        assert!(stop.is_triggered(dec!(107.8)));
        assert!(stop.is_triggered(dec!(105)));
    }

    #[test]
    fn test_trigger_short() {
        let mut stop = TrailingStop::new(dec!(100), Side::Sell, dec!(2));
        stop.observe(dec!(90));
        // Stop sits at 90 * 1.02 = 91.8.
        assert_eq!(stop.stop_level(), dec!(91.8000));
        assert!(!stop.is_triggered(dec!(91)));
        assert!(stop.is_triggered(dec!(91.8)));
        assert!(stop.is_triggered(dec!(95)));
    }
}
