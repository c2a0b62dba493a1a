//! Bounded retry with randomized backoff.
//!
//! Every remote call made by [`RetryingStore`](crate::RetryingStore) goes
//! through [`RetryPolicy::run`]. An attempt that fails with a
//! [`RetryClass::WithBackoff`] error is followed by a random pause and
//! another attempt, until the attempt budget is spent. Any other error is
//! returned immediately.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use rand::Rng;

use crate::errors::{Result, RetryClass};

/// Default number of attempts per operation, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 15;

/// Default upper bound of the random pause between attempts.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(1);

/// Retry policy configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts per operation. Zero is treated as one.
    pub max_attempts: u32,
    /// Pauses are drawn uniformly from `[0, max_backoff]`.
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

/// Applies a [`RetryConfig`] to async operations.
#[derive(Clone, Debug, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a policy with default settings (15 attempts, up to 1s pause).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a policy with custom configuration.
    pub fn with_config(config: RetryConfig) -> Self {
        Self { config }
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Draw the pause before the next attempt.
    pub fn backoff(&self) -> Duration {
        let max = self.config.max_backoff;
        if max.is_zero() {
            return Duration::ZERO;
        }
        rand::thread_rng().gen_range(Duration::ZERO..=max)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is exhausted.
    ///
    /// On exhaustion the error of the last attempt is returned unchanged.
    /// `name` is only used for logging.
    pub async fn run<T, F, Fut>(&self, name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}/{}", name, attempt, max_attempts);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    if e.retry_class() == RetryClass::Never {
                        debug!("{} failed with non-retryable error: {}", name, e);
                        return Err(e);
                    }
                    if attempt >= max_attempts {
                        warn!(
                            "{} failed after {} attempts, giving up: {}",
                            name, attempt, e
                        );
                        return Err(e);
                    }

                    let pause = self.backoff();
                    warn!(
                        "{} attempt {}/{} failed: {}; retrying in {}ms",
                        name,
                        attempt,
                        max_attempts,
                        e,
                        pause.as_millis()
                    );
                    tokio::time::sleep(pause).await;
                    attempt += 1;
                }
            }
        }
    }
}
