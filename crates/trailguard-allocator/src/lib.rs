//! Pre-trade capital allocation.
//!
//! Filters, scores, diversifies, and sizes candidate trades under a budget
//! constraint before any gateway call is made.

mod allocator;

pub use allocator::{allocate, AllocationMethod, AllocatorConfig, DiversifyBy};
