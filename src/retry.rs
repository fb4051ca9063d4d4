//! Bounded retry with exponential backoff for remote calls.
//!
//! Gateways wrap their HTTP and RPC calls with this before surfacing an
//! error to the monitor or coordinator, so a single transient failure does
//! not cost a whole cycle.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the retry following zero-based failed attempt
    /// `attempt`, doubling from `base_delay` up to `max_delay`.
    fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `op` until it succeeds or the policy's attempts are exhausted.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, op_name: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < policy.max_attempts => {
                let backoff = policy.delay_after(attempt);
                warn!(
                    op = op_name,
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Remote call failed, backing off"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("{op_name} failed after {} attempts", attempt + 1));
            }
        }
    }
}
