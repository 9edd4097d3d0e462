//! # Retry policy: attempt budget plus backoff.

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// How many times a unit of work is attempted and how long to wait in between.
///
/// `max_attempts` counts the first attempt, so `1` means "no retries".
/// Values below `1` are raised to `1` by [`RetryPolicy::new`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: BackoffPolicy,
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget and backoff.
    pub fn new(max_attempts: u32, backoff: BackoffPolicy) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Single attempt, never retried.
    pub fn once() -> Self {
        Self::new(1, BackoffPolicy::default())
    }

    /// Maximum number of attempts (>= 1).
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff applied between attempts.
    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Wait after failed attempt `attempt` (0-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.next(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, BackoffPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_attempts_raised_to_one() {
        assert_eq!(RetryPolicy::new(0, BackoffPolicy::default()).max_attempts(), 1);
        assert_eq!(RetryPolicy::once().max_attempts(), 1);
    }

    #[test]
    fn delay_follows_backoff() {
        let policy = RetryPolicy::new(
            5,
            BackoffPolicy::doubling(Duration::from_millis(50), Duration::from_millis(150)),
        );
        assert_eq!(policy.delay_after(0), Duration::from_millis(50));
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(150));
    }
}
