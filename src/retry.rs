use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{GatewayError, Result};

/// Bounded exponential backoff for opening an upstream streaming connection.
///
/// Only rate-limit errors are retried; every other error kind propagates on
/// the first attempt. The policy wraps connection establishment, never an
/// already-started stream.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Delay before retrying `attempt` (0-based): `min(base * 2^attempt,
    /// max)`, overridden by an upstream `Retry-After` seconds hint when one
    /// was parseable. The hint is capped at `max_delay` too.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<u64>) -> Duration {
        if let Some(secs) = retry_after {
            return Duration::from_secs(secs).min(self.max_delay);
        }
        let shift = attempt.min(16);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    /// Run `open` until it succeeds, the retry budget is spent, or it fails
    /// with anything other than a rate limit.
    pub async fn open_with_retry<T, F, Fut>(&self, mut open: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match open().await {
                Ok(value) => return Ok(value),
                Err(GatewayError::RateLimited { retry_after }) if attempt < self.max_retries => {
                    let delay = self.delay_for(attempt, retry_after);
                    warn!(
                        attempt = attempt + 1,
                        max = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "upstream rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
