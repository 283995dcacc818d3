//! Bounded retry with jittered exponential backoff.
//!
//! A reusable policy wrapped around any fallible store operation, so the
//! retry loop is written once instead of per call site. Only errors the
//! operation classifies as transient are retried; semantic failures such as
//! duplicate keys pass through immediately.

use std::fmt;
use std::thread;
use std::time::Duration;

/// Classifies an error as transient (worth retrying) or terminal.
pub trait Transient {
    /// Returns true if retrying the failed operation could succeed.
    fn is_transient(&self) -> bool;
}

/// Retry policy: bounded attempts with jittered exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Must be at least 1.
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles on each further attempt.
    pub base_delay: Duration,

    /// Upper bound on the backoff delay before jitter.
    pub max_delay: Duration,

    /// Maximum random jitter added to each delay to avoid thundering herds.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            jitter: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// Runs `op` until it succeeds, fails terminally, or attempts run out.
    ///
    /// # Arguments
    /// * `op` - The fallible operation to execute
    ///
    /// # Returns
    /// The operation's success value, or the last error observed
    pub fn run<T, E, F>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: Transient + fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "transient store error, backing off"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Backoff delay before attempt `attempt + 1`.
    fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = (attempt - 1).min(16);
        let backoff = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);

        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            backoff
        } else {
            // Simple jitter to prevent thundering herd
            backoff + Duration::from_millis(rand::random::<u64>() % jitter_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FakeError {
        transient: bool,
    }

    impl fmt::Display for FakeError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "fake error (transient: {})", self.transient)
        }
    }

    impl Transient for FakeError {
        fn is_transient(&self) -> bool {
            self.transient
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter: Duration::ZERO,
        }
    }

    #[test]
    fn test_success_first_try() {
        let policy = fast_policy();
        let mut calls = 0;
        let result: Result<u32, FakeError> = policy.run(|| {
            calls += 1;
            Ok(42)
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_transient_errors_retried_until_success() {
        let policy = fast_policy();
        let mut calls = 0;
        let result: Result<u32, FakeError> = policy.run(|| {
            calls += 1;
            if calls < 3 {
                Err(FakeError { transient: true })
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_attempts_are_bounded() {
        let policy = fast_policy();
        let mut calls = 0;
        let result: Result<u32, FakeError> = policy.run(|| {
            calls += 1;
            Err(FakeError { transient: true })
        });
        assert!(result.is_err());
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_terminal_error_not_retried() {
        let policy = fast_policy();
        let mut calls = 0;
        let result: Result<u32, FakeError> = policy.run(|| {
            calls += 1;
            Err(FakeError { transient: false })
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
            jitter: Duration::ZERO,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(10));
        assert_eq!(policy.delay_for(2), Duration::from_millis(20));
        assert_eq!(policy.delay_for(3), Duration::from_millis(40));
        assert_eq!(policy.delay_for(8), Duration::from_millis(40));
    }
}
