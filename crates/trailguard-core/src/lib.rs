//! Core types and traits for the position supervision engine.
//!
//! This crate provides the foundational building blocks including:
//! - Order, position, and candidate trade types
//! - Protective price level and task submission records
//! - The broker gateway, persistence, and alert contracts

pub mod error;
pub mod traits;
pub mod types;

pub use error::{TrailguardError, TrailguardResult};
pub use traits::*;
pub use types::*;
