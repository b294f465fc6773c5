//! Persistence store implementations.
//!
//! The engine only needs a key/value-like store scoped by `strategy_id`;
//! these back it with process memory or an append-only JSON-lines directory.

mod jsonl;
mod memory;

pub use jsonl::JsonlStore;
pub use memory::{FeedbackEntry, MemoryStore};
