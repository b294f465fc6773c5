//! Post-entry supervision of open positions.
//!
//! A [`Supervisor`] owns one position: it polls the venue, ratchets the
//! trailing stop, and closes the position when the trigger is crossed. The
//! [`Scheduler`] runs supervisors on a worker pool backed by a durable task
//! queue, with bounded task-level retries and operator cancellation.

pub mod retry;
pub mod scheduler;
pub mod state;
pub mod task;

#[cfg(test)]
mod testing;

pub use retry::{with_retries, RetryPolicy};
pub use scheduler::{Scheduler, SupervisorSettings, TaskHandle};
pub use state::{Phase, SupervisorState};
pub use task::{realized_profit_pct, PollError, PollOutcome, Supervisor};
