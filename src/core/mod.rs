//! Runtime core: execution engines and run lifecycle.
//!
//! Public engines:
//! - [`RetryExecutor`]: bounded retries with interruptible backoff;
//! - [`WorkerPool`]: bounded concurrency over a static item stream, first error wins;
//! - [`QueueDrainCoordinator`]: drains a shared queue, isolating item failures;
//! - [`Harness`]: owns a run (bus, subscribers, signals, mode dispatch).
//!
//! Internal modules:
//! - `holding`: post-success [`hold`] window;
//! - `signals`: cross-platform termination signals;
//! - `builder`: [`HarnessBuilder`].

mod builder;
mod drain;
mod harness;
mod holding;
mod pool;
mod retry;
mod signals;

pub use builder::HarnessBuilder;
pub use drain::{DrainReport, DrainState, QueueDrainCoordinator};
pub use harness::Harness;
pub use holding::hold;
pub use pool::{PoolReport, WorkerPool};
pub use retry::RetryExecutor;
