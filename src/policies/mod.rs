//! Retry policies.
//!
//! This module groups the knobs that control **how many** attempts a unit of
//! work gets and **how long** to wait between them.
//!
//! ## Contents
//! - [`RetryPolicy`]   attempt budget plus backoff
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid thundering herd
//!
//! ## Quick wiring
//! ```text
//! Config { retry_max, retry_backoff, retry_backoff_cap, retry_jitter }
//!      └─► RetryPolicy { max_attempts, backoff }
//!           └─► core::retry::RetryExecutor uses:
//!                - max_attempts to bound the loop
//!                - backoff.next(attempt) to schedule the next attempt
//! ```
//!
//! ## Defaults
//! - `RetryPolicy::default()` → 3 attempts.
//! - `BackoffPolicy::default()` → first=1s, factor=2.0 (doubling), max=30s, jitter=None.

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;
