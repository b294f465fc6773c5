//! CLI command implementations.

pub mod allocate;
pub mod close_all;
pub mod execute;
pub mod run;
pub mod validate;
pub mod venues;
