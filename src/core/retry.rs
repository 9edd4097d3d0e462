//! # RetryExecutor: bounded retries with exponential backoff.
//!
//! Wraps one fallible operation and runs it up to
//! [`RetryPolicy::max_attempts`] times, sleeping per
//! [`BackoffPolicy`](crate::BackoffPolicy) between failures.
//!
//! ## Flow
//! ```text
//! for attempt in 1..=max_attempts {
//!   ├─► publish AttemptStarting{ subject, attempt }
//!   ├─► op(attempt).await
//!   │     ├─ Ok(v)                      ─► return Ok(v)
//!   │     ├─ Err(Fatal | Canceled)      ─► publish AttemptFailed, return Err
//!   │     ├─ Err(e), last attempt       ─► publish AttemptFailed, return Err(e)
//!   │     └─ Err(e), attempts remain    ─► publish BackoffScheduled{ delay }
//!   │                                      select! {
//!   │                                        token.cancelled() ─► return Err(Canceled)
//!   │                                        sleep(delay)      ─► next attempt
//!   │                                      }
//! }
//! ```
//!
//! ## Rules
//! - The operation is never invoked again after it succeeded.
//! - The last failure is returned verbatim.
//! - Cancellation is observed **between** attempts only: a running attempt is
//!   never interrupted, but no further attempt starts once the token fires.
//! - Cancellation during a backoff wait always wins over the wait completing.

use std::future::Future;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::error::ProcessError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::RetryPolicy;

/// Runs operations under a [`RetryPolicy`], publishing attempt events.
#[derive(Clone, Debug)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    bus: Bus,
}

impl RetryExecutor {
    /// Creates an executor for `policy`, publishing to `bus`.
    pub fn new(policy: RetryPolicy, bus: Bus) -> Self {
        Self { policy, bus }
    }

    /// The policy this executor applies.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Event bus used for attempt events.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Executes `op` with retries.
    ///
    /// `op` receives the 1-based attempt number. `subject` names the work in
    /// events (item id, target URL).
    ///
    /// ### Returns
    /// - `Ok(v)` from the first successful attempt;
    /// - `Err(ProcessError::Canceled)` if `token` fired during a backoff wait;
    /// - otherwise the error of the last attempt made.
    pub async fn execute<T, F, Fut>(
        &self,
        subject: &str,
        token: &CancellationToken,
        mut op: F,
    ) -> Result<T, ProcessError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProcessError>>,
    {
        let max = self.policy.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            self.bus.publish(
                Event::new(EventKind::AttemptStarting)
                    .with_subject(subject)
                    .with_attempt(attempt),
            );

            let err = match op(attempt).await {
                Ok(v) => return Ok(v),
                Err(e) => e,
            };

            if !err.is_retryable() || attempt >= max {
                self.bus.publish(
                    Event::new(EventKind::AttemptFailed)
                        .with_subject(subject)
                        .with_attempt(attempt)
                        .with_reason(err.to_string()),
                );
                return Err(err);
            }

            let delay = self.policy.delay_after(attempt - 1);
            self.bus.publish(
                Event::new(EventKind::BackoffScheduled)
                    .with_subject(subject)
                    .with_attempt(attempt)
                    .with_delay(delay)
                    .with_reason(err.to_string()),
            );

            select! {
                biased;
                _ = token.cancelled() => return Err(ProcessError::Canceled),
                _ = time::sleep(delay) => {}
            }
        }
    }
}
