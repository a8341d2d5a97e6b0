//! Bounded retry with exponential backoff
//!
//! Retry-with-backoff shows up at every unreliable call site in this engine,
//! so it lives here as one reusable combinator instead of a loop per caller.
//! Delays start at the configured initial value and double on each retry;
//! the sleep holds no lock, connection or transaction.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry budget for a fallible asynchronous operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on every retry after that.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay applied after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.initial_delay * 2_u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Runs `operation` up to the policy's attempt budget, sleeping with doubling
/// backoff between failures. The attempt number (1-based) is passed to each
/// invocation; the error of the final attempt is returned once the budget is
/// exhausted.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let budget = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < budget => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "⚠️ {} failed on attempt {}/{}: {} (retrying in {:?})",
                    label, attempt, budget, error, delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(error) => {
                warn!("❌ {} exhausted {} attempts: {}", label, budget, error);
                return Err(error);
            }
        }
    }
}
