//! Retry policy for transient engine failures.

use crate::core::ScanConfig;

use std::time::Duration;

/// How many times to run a scan body and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, at least 1.
    pub max_attempts: u32,

    /// Blocking pause before each retry.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::no_retry()
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// A single attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }

    /// Reads `scan_retry_max_attempts` and `scan_retry_attempt_delay`.
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.max_attempts(), config.scan_retry_attempt_delay)
    }

    /// Returns whether another attempt may follow `attempts` made so far.
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Runs `operation` until `is_retryable` rejects its result or the
    /// attempts run out.
    ///
    /// Returns the last result together with the number of attempts made.
    pub fn execute<T, F, P>(&self, mut operation: F, is_retryable: P) -> (T, u32)
    where
        F: FnMut() -> T,
        P: Fn(&T) -> bool,
    {
        let mut attempts = 0;
        loop {
            let result = operation();
            attempts += 1;

            if !is_retryable(&result) || !self.should_retry(attempts) {
                return (result, attempts);
            }

            tracing::debug!(
                attempt = attempts,
                max_attempts = self.max_attempts,
                delay_ms = self.delay.as_millis() as u64,
                "Retrying scan"
            );
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
        }
    }
}

/// Runs `operation` under a [`RetryPolicy`] and returns its final result.
pub fn retry<T, F, P>(operation: F, is_retryable: P, max_attempts: u32, delay: Duration) -> T
where
    F: FnMut() -> T,
    P: Fn(&T) -> bool,
{
    RetryPolicy::new(max_attempts, delay)
        .execute(operation, is_retryable)
        .0
}
