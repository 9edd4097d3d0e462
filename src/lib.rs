//! # jobvisor
//!
//! **Jobvisor** is a small execution harness for batch jobs that run as many
//! identical members (e.g. a Kubernetes Job with `completions > 1`).
//!
//! It wraps a user [`Processor`] with bounded retries and runs it in one of
//! four topologies: one item per member index, a fixed list through a
//! bounded pool, a ring handshake between peers, or a shared queue drained
//! until empty.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                        ┌──────────────────────────────┐
//!                        │ Harness (Config, Bus, Subs)  │
//!                        │  - run token + OS signals    │
//!                        └──────────────┬───────────────┘
//!                                       ▼ dispatch(mode)
//!    ┌──────────────┬───────────────────┼───────────────────┬──────────────────┐
//!    ▼              ▼                   ▼                   ▼                  │
//! indexed         fixed               peer                queue                │
//! one item     StaticItems       PeerRingResolver       WorkQueue (Redis)      │
//!    │          WorkerPool        HandshakeClient   QueueDrainCoordinator      │
//!    │              │              LivenessEndpoint        │ DrainState        │
//!    └──────────────┴───────┬───────────┴──────────────────┘                   │
//!                           ▼                                                  │
//!                    RetryExecutor ── Processor::process(item, token)          │
//!                           │                                                  │
//!                           │ publishes AttemptStarting / BackoffScheduled /   │
//!                           │ ItemCompleted / QueueExhausted / ...             │
//!                           ▼                                                  ▼
//! ┌───────────────────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                                │
//! └─────────────────────────────────────┬─────────────────────────────────────────┘
//!                                       ▼
//!                          SubscriberSet (per-sub queues)
//!                             ┌─────────┼─────────┐
//!                             ▼         ▼         ▼
//!                         LogWriter   custom     ...
//! ```
//!
//! ### Retry loop
//! ```text
//! for attempt in 1..=max_attempts {
//!   ├─► publish AttemptStarting
//!   ├─► processor.process(item, token)
//!   │       ├─ Ok                   ─► done
//!   │       ├─ Fatal / Canceled     ─► AttemptFailed, stop
//!   │       └─ Fail / Timeout       ─► BackoffScheduled{ min(first·2ⁿ, cap) }
//!   │                                   sleep (cancellable), continue
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                                  |
//! |-------------------|----------------------------------------------------------|-----------------------------------------------------|
//! | **Units of work** | Retry-safe, cancelable processing of one item.           | [`Processor`], [`ProcessorFn`], [`UppercaseFile`]   |
//! | **Policies**      | Attempts, doubling backoff with cap, optional jitter.    | [`RetryPolicy`], [`BackoffPolicy`], [`JitterPolicy`]|
//! | **Engines**       | Retry, bounded pool, queue drain.                        | [`RetryExecutor`], [`WorkerPool`], [`QueueDrainCoordinator`] |
//! | **Peers**         | Deterministic ring, warm-up, successor handshake.        | [`PeerRingResolver`], [`PeerSet`], [`HandshakeClient`] |
//! | **Subscriber API**| Observe runtime events.                                  | [`Subscribe`], [`LogWriter`]                        |
//! | **Errors**        | Typed run and attempt errors.                            | [`RunError`], [`ProcessError`]                      |
//! | **Configuration** | Environment-driven settings and run mode.                | [`Config`], [`RunMode`]                             |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use futures::stream;
//! use tokio_util::sync::CancellationToken;
//! use jobvisor::{
//!     BackoffPolicy, Bus, ProcessError, ProcessorFn, RetryExecutor, RetryPolicy, WorkItem,
//!     WorkerPool,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let policy = RetryPolicy::new(
//!         3,
//!         BackoffPolicy::doubling(Duration::from_millis(10), Duration::from_millis(100)),
//!     );
//!     let pool = WorkerPool::new(2, RetryExecutor::new(policy, Bus::default()));
//!
//!     let echo = ProcessorFn::arc(|item: WorkItem, _token: CancellationToken| async move {
//!         println!("processing {item}");
//!         Ok::<_, ProcessError>(())
//!     });
//!
//!     let items = vec![WorkItem::new("a", "/in/a.txt"), WorkItem::new("b", "/in/b.txt")];
//!     let report = pool
//!         .run(stream::iter(items), echo, &CancellationToken::new())
//!         .await?;
//!     assert_eq!(report.completed, 2);
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod items;
mod modes;
mod peer;
mod policies;
mod processor;
mod subscribers;

// ---- Public re-exports ----

pub use config::{Config, RunMode, parse_duration};
pub use crate::core::{
    DrainReport, DrainState, Harness, HarnessBuilder, PoolReport, QueueDrainCoordinator,
    RetryExecutor, WorkerPool, hold,
};
pub use error::{ProcessError, RunError};
pub use events::{Bus, Event, EventKind};
pub use items::{QueueError, RedisQueue, StaticItems, WorkItem, WorkQueue};
pub use peer::{
    DEFAULT_POLL, DnsResolver, HANDSHAKE_TIMEOUT, Handshake, HandshakeClient, LivenessEndpoint,
    PeerRingResolver, PeerSet, Resolve, RingPosition,
};
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
pub use processor::{Processor, ProcessorFn, ProcessorRef, UppercaseFile};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
