//! Core data types for the supervision engine.

mod candidate;
mod candle;
mod levels;
mod order;
mod position;
mod task;
mod venue;

pub use candidate::{AllocatedTrade, Candidate};
pub use candle::Candle;
pub use levels::RiskLevels;
pub use order::{MarginMode, OrderRequest, OrderResult, OrderStatus, Side};
pub use position::Position;
pub use task::TaskSpec;
pub use venue::Venue;
