//! Risk computation for supervised positions.
//!
//! Pure functions of entry context: static stop-loss/take-profit levels,
//! volatility measurement, and the trailing-stop ratchet.

mod engine;
mod trailing;
mod volatility;

pub use engine::{RiskConfig, RiskEngine, StaticLevels};
pub use trailing::TrailingStop;
pub use volatility::Atr;
