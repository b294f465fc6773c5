//! Core traits for the supervision engine.

mod alerts;
mod gateway;
mod store;

pub use alerts::{AlertSink, Severity};
pub use gateway::BrokerGateway;
pub use store::{FeedbackOutcome, PersistenceStore};
