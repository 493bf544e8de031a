//! Bounded retry with exponential backoff.
//!
//! One [`RetryPolicy`] drives two runners with identical semantics:
//! [`RetryPolicy::run_blocking`] sleeps the calling thread between attempts,
//! [`RetryPolicy::run_async`] awaits `tokio::time::sleep` and never blocks the
//! executor. Only errors for which [`ZoektError::is_retryable`] holds are
//! retried; the last error is returned unchanged once attempts are exhausted.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use crate::error_handler::{ConfigError, Result, ZoektError};

/// Upper bound of the jitter fraction added on top of a backoff delay.
const JITTER_FRACTION: f64 = 0.25;

/// Retry parameters for a client.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per logical call, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Cap applied to every computed delay.
    pub max_delay: Duration,
    /// Add up to 25% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that performs exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Validates retry bounds.
    ///
    /// # Errors
    /// Returns [`ConfigError::OutOfRange`] when `max_attempts` is zero or
    /// `max_delay` is below `base_delay`.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::OutOfRange {
                field: "max_attempts",
                detail: "expected at least 1",
            }
            .into());
        }
        if self.max_delay < self.base_delay {
            return Err(ConfigError::OutOfRange {
                field: "max_delay",
                detail: "expected max_delay >= base_delay",
            }
            .into());
        }
        Ok(())
    }

    /// Backoff delay after failed attempt `attempt` (1-indexed), without jitter:
    /// `base_delay * 2^(attempt - 1)`, capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exp)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Backoff delay with jitter applied when enabled; never exceeds `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.backoff(attempt);
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let fraction = rand::rng().random_range(0.0..=JITTER_FRACTION);
        delay.mul_f64(1.0 + fraction).min(self.max_delay)
    }

    /// Runs `operation` on the calling thread until it succeeds, fails with a
    /// non-retryable error, or `max_attempts` is reached.
    pub fn run_blocking<T, F>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match operation() {
                Ok(value) => {
                    self.log_success(operation_name, attempt);
                    return Ok(value);
                }
                Err(error) => {
                    let delay = self.next_delay(operation_name, attempt, &error).ok_or(error)?;
                    std::thread::sleep(delay);
                }
            }
        }
    }

    /// Async counterpart of [`RetryPolicy::run_blocking`].
    ///
    /// Attempts are sequential. Dropping the returned future cancels the call
    /// and no further attempt is made.
    pub async fn run_async<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => {
                    self.log_success(operation_name, attempt);
                    return Ok(value);
                }
                Err(error) => {
                    let delay = self.next_delay(operation_name, attempt, &error).ok_or(error)?;
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Decides whether to retry after `attempt` failed. `None` means give up.
    fn next_delay(&self, operation_name: &str, attempt: u32, error: &ZoektError) -> Option<Duration> {
        if !error.is_retryable() {
            warn!(
                operation = operation_name,
                attempt,
                error = %error,
                "non-retryable failure"
            );
            return None;
        }
        if attempt >= self.max_attempts {
            warn!(
                operation = operation_name,
                attempts = attempt,
                error = %error,
                "giving up after exhausting attempts"
            );
            return None;
        }
        let delay = self.delay_for(attempt);
        warn!(
            operation = operation_name,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "attempt failed, retrying"
        );
        Some(delay)
    }

    fn log_success(&self, operation_name: &str, attempt: u32) {
        if attempt > 1 {
            info!(
                operation = operation_name,
                attempts = attempt,
                "succeeded after retries"
            );
        }
    }
}
