//! Exponential-backoff retry for arbitrary async operations.
//!
//! Every failure is retried the same way; the policy never inspects or
//! rewrites the error, it only waits and tries again.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts made after the first one fails.
    pub max_retries: u32,
    /// Wait before the first retry; doubles after each further failure.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self { max_retries, initial_delay }
    }

    /// The waits between attempts, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let initial = self.initial_delay;
        (0..self.max_retries).map(move |n| initial.saturating_mul(2u32.saturating_pow(n)))
    }

    /// Run `operation` until it succeeds or the retries run out, returning the
    /// last error unchanged in the latter case.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut retries_left = self.max_retries;
        let mut delay = self.initial_delay;
        let mut attempt = 1u32;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if retries_left == 0 => return Err(e),
                Err(e) => {
                    warn!(
                        attempt,
                        retries_left,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Operation failed, retrying",
                    );
                    tokio::time::sleep(delay).await;
                    retries_left -= 1;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
            }
        }
    }
}
