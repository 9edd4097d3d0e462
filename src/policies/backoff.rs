//! # Backoff policy for retrying units of work.
//!
//! [`BackoffPolicy`] controls how retry delays grow after repeated failures.
//! It is parameterized by:
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::first`] the initial delay;
//! - [`BackoffPolicy::max`] the maximum delay cap.
//!
//! The delay after failed attempt `n` (0-indexed) is `first × factor^n`, clamped
//! to `max`, then jitter is applied. The base is derived from the attempt number
//! only, so jitter output never feeds back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use jobvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! assert_eq!(backoff.next(1), Duration::from_millis(200));
//! // 100ms × 2^10 = 102_400ms → capped at max=10s
//! assert_eq!(backoff.next(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay after the first failed attempt.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`2.0` doubles each time).
    pub factor: f64,
    /// Jitter policy to prevent thundering herd.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a doubling strategy:
    /// - `first = 1s`;
    /// - `factor = 2.0`;
    /// - `max = 30s`.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Doubling backoff from `first`, capped at `max`, without jitter.
    pub fn doubling(first: Duration, max: Duration) -> Self {
        Self {
            first,
            max,
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Returns a copy with the given jitter.
    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Computes the wait after failed attempt `attempt` (0-indexed).
    ///
    /// The base delay is `first × factor^attempt`, clamped to [`BackoffPolicy::max`].
    /// Computed in nanoseconds so integer factors give exact durations.
    pub fn next(&self, attempt: u32) -> Duration {
        let max_nanos = self.max.as_nanos() as f64;
        let exp = attempt.min(i32::MAX as u32) as i32;
        let unclamped = self.first.as_nanos() as f64 * self.factor.powi(exp);

        let base = if !unclamped.is_finite() || unclamped < 0.0 || unclamped > max_nanos {
            self.max
        } else {
            Duration::from_nanos(unclamped as u64)
        };

        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn doubling(first_ms: u64, max: Duration) -> BackoffPolicy {
        BackoffPolicy::doubling(Duration::from_millis(first_ms), max)
    }

    #[test]
    fn test_attempt_zero_returns_first() {
        let policy = doubling(100, Duration::from_secs(30));
        assert_eq!(policy.next(0), Duration::from_millis(100));
    }

    #[test]
    fn test_exponential_growth_no_jitter() {
        let policy = doubling(100, Duration::from_secs(30));

        assert_eq!(policy.next(0), Duration::from_millis(100));
        assert_eq!(policy.next(1), Duration::from_millis(200));
        assert_eq!(policy.next(2), Duration::from_millis(400));
        assert_eq!(policy.next(3), Duration::from_millis(800));
    }

    #[test]
    fn test_odd_first_stays_exact() {
        let policy = doubling(300, Duration::from_secs(30));
        assert_eq!(policy.next(0), Duration::from_millis(300));
        assert_eq!(policy.next(1), Duration::from_millis(600));
        assert_eq!(policy.next(2), Duration::from_millis(1200));
    }

    #[test]
    fn test_growth_past_cap_is_clamped() {
        let policy = doubling(400, Duration::from_secs(1));
        assert_eq!(policy.next(0), Duration::from_millis(400));
        assert_eq!(policy.next(1), Duration::from_millis(800));
        assert_eq!(policy.next(2), Duration::from_secs(1));
        assert_eq!(policy.next(3), Duration::from_secs(1));
    }

    #[test]
    fn test_first_exceeds_max() {
        let policy = BackoffPolicy::doubling(Duration::from_secs(10), Duration::from_secs(5));
        assert_eq!(policy.next(0), Duration::from_secs(5));
    }

    #[test]
    fn test_zero_first_never_waits() {
        let policy = BackoffPolicy::doubling(Duration::ZERO, Duration::from_secs(5));
        for attempt in 0..8 {
            assert_eq!(policy.next(attempt), Duration::ZERO);
        }
    }

    #[test]
    fn test_non_finite_overflow_clamps_to_max() {
        let policy = doubling(100, Duration::from_secs(10));
        assert_eq!(policy.next(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_full_jitter_stays_below_base() {
        let policy = doubling(100, Duration::from_secs(30)).with_jitter(JitterPolicy::Full);

        for attempt in 0..12 {
            let base = (100u64 << attempt).min(30_000);
            let delay = policy.next(attempt);
            assert!(
                delay <= Duration::from_millis(base),
                "attempt {attempt}: delay {delay:?} exceeds base {base}ms"
            );
        }
    }

    #[test]
    fn test_equal_jitter_bounds() {
        let policy = doubling(1000, Duration::from_secs(30)).with_jitter(JitterPolicy::Equal);
        for _ in 0..50 {
            let delay = policy.next(0);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1000));
        }
    }
}
