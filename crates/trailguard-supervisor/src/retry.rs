//! Bounded retry for gateway calls.

use std::future::Future;
use std::time::Duration;
use tracing::warn;
use trailguard_core::error::GatewayError;

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Run a gateway call, retrying transient failures up to the policy bound.
///
/// Business declines (`Rejected`, `Authentication`) return immediately; only
/// errors the taxonomy marks transient burn attempts.
pub async fn with_retries<T, F, Fut>(
    policy: RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                warn!(
                    "{operation} failed (attempt {attempt}/{}): {err}; retrying",
                    policy.max_attempts
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
