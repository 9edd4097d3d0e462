//! # WorkerPool: bounded-concurrency execution over an item stream.
//!
//! Pulls [`WorkItem`]s from a lazy stream and runs each through the
//! [`RetryExecutor`] under a fixed concurrency ceiling.
//!
//! ## Architecture
//! ```text
//! items (Stream) ──► free slot? ──► next item ──► JoinSet::spawn
//!                        ▲                             │
//!                        └──── join_next() + record ◄──┘
//!                                                      ▼
//!                                      retry.execute(processor.process(item))
//! ```
//!
//! ## Rules
//! - At most `concurrency` items are in flight; an item is not pulled from the
//!   stream until a finished item has been joined and recorded.
//! - The first terminal item failure stops further offering: outcomes are
//!   recorded before every pull, so no item is pulled after a failure is
//!   known. In-flight items run to completion and the first failure is returned.
//! - Cancellation stops offering; in-flight items finish their current
//!   attempt (no further retries) and the pool returns [`RunError::Cancelled`].
//! - Completion order is unspecified.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::{select, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::core::retry::RetryExecutor;
use crate::error::{ProcessError, RunError};
use crate::events::{Event, EventKind};
use crate::items::WorkItem;
use crate::processor::ProcessorRef;

/// Outcome of a pool run that finished without error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// Items that completed successfully.
    pub completed: u64,
}

/// Per-item result carried out of the join set.
type ItemOutcome = (String, Result<(), ProcessError>);

/// Bounded-concurrency pool with fail-fast aggregation.
pub struct WorkerPool {
    concurrency: usize,
    retry: RetryExecutor,
}

impl WorkerPool {
    /// Creates a pool running at most `concurrency` items at once (min 1).
    pub fn new(concurrency: usize, retry: RetryExecutor) -> Self {
        Self {
            concurrency: concurrency.max(1),
            retry,
        }
    }

    /// Concurrency ceiling.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs every item from `items` through `processor`.
    pub async fn run<S>(
        &self,
        mut items: S,
        processor: ProcessorRef,
        token: &CancellationToken,
    ) -> Result<PoolReport, RunError>
    where
        S: Stream<Item = WorkItem> + Send + Unpin,
    {
        tracing::info!(concurrency = self.concurrency, "worker pool starting");

        let mut set: JoinSet<ItemOutcome> = JoinSet::new();
        let mut tally = Tally::default();

        loop {
            while let Some(joined) = set.try_join_next() {
                tally.record(joined, &self.retry);
            }
            if tally.first_error.is_some() {
                break;
            }

            if set.len() >= self.concurrency {
                select! {
                    biased;
                    _ = token.cancelled() => break,
                    Some(joined) = set.join_next() => {
                        tally.record(joined, &self.retry);
                        continue;
                    }
                }
            }

            let item = select! {
                biased;
                _ = token.cancelled() => break,
                next = items.next() => match next {
                    Some(item) => item,
                    None => break,
                },
            };

            let retry = self.retry.clone();
            let processor = Arc::clone(&processor);
            let token = token.clone();
            set.spawn(async move {
                let res = retry
                    .execute(item.id(), &token, |_| processor.process(&item, &token))
                    .await;
                (item.id().to_string(), res)
            });
        }

        while let Some(joined) = set.join_next().await {
            tally.record(joined, &self.retry);
        }

        if let Some(err) = tally.first_error {
            tracing::warn!(completed = tally.completed, "worker pool failed");
            return Err(err);
        }
        if token.is_cancelled() || tally.cancelled {
            return Err(RunError::Cancelled);
        }

        tracing::info!(completed = tally.completed, "worker pool finished");
        Ok(PoolReport {
            completed: tally.completed,
        })
    }
}

/// Aggregated results; first terminal failure wins.
#[derive(Default)]
struct Tally {
    completed: u64,
    cancelled: bool,
    first_error: Option<RunError>,
}

impl Tally {
    fn record(
        &mut self,
        joined: Result<ItemOutcome, tokio::task::JoinError>,
        retry: &RetryExecutor,
    ) {
        match joined {
            Ok((id, Ok(()))) => {
                self.completed += 1;
                retry
                    .bus()
                    .publish(Event::new(EventKind::ItemCompleted).with_subject(id));
            }
            Ok((_id, Err(ProcessError::Canceled))) => {
                self.cancelled = true;
            }
            Ok((id, Err(e))) => {
                retry.bus().publish(
                    Event::new(EventKind::ItemAbandoned)
                        .with_subject(id.as_str())
                        .with_reason(e.to_string()),
                );
                if self.first_error.is_none() {
                    self.first_error = Some(RunError::ItemFailed {
                        item: id,
                        source: e,
                    });
                }
            }
            Err(join_err) => {
                if self.first_error.is_none() {
                    self.first_error = Some(RunError::WorkerPanicked {
                        error: join_err.to_string(),
                    });
                }
            }
        }
    }
}
