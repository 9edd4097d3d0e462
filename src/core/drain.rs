//! # QueueDrainCoordinator: drain a shared remote queue until it is empty.
//!
//! Runs `workers` identical polling loops against one [`WorkQueue`]. Each loop
//! pops with a bounded wait, processes the payload through the
//! [`RetryExecutor`], and goes back to polling.
//!
//! ## Worker state machine
//! ```text
//!            ┌──────────── item done (ok or isolated failure) ◄───┐
//!            ▼                                                    │
//!        POLLING ── pop(wait) ──► Some(payload) ──────────► PROCESSING
//!            │
//!            ├── None (wait elapsed) ──► declare_exhausted() ──► STOPPED
//!            ├── transport error     ──► cancel scope        ──► STOPPED (error)
//!            └── scope cancelled     ─────────────────────────► STOPPED
//! ```
//!
//! ## Rules
//! - The first worker whose wait elapses declares exhaustion; that cancels the
//!   shared scope so no sibling issues another pop.
//! - A permanently failing item is counted and skipped; draining continues.
//! - Retries of an item in progress observe the **run** token only, so
//!   exhaustion declared by a sibling never aborts an item mid-retry.
//! - A transport error is terminal for the run; the first one is returned.
//! - Before any worker starts, an empty queue ends the run immediately.
//! - Payloads pushed after exhaustion are not picked up.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::{select, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::core::retry::RetryExecutor;
use crate::error::{ProcessError, RunError};
use crate::events::{Event, EventKind};
use crate::items::{WorkItem, WorkQueue};
use crate::processor::ProcessorRef;

/// Per-run state shared by all drain workers.
///
/// Holds the success/failure counters and the single-fire exhaustion scope.
/// The scope is a child of the run token: cancelling the run also stops the
/// drain, but declaring exhaustion does not cancel the run.
#[derive(Debug)]
pub struct DrainState {
    succeeded: AtomicU64,
    failed: AtomicU64,
    exhausted: AtomicBool,
    scope: CancellationToken,
}

impl DrainState {
    /// Creates state whose exhaustion scope is a child of `run`.
    pub fn new(run: &CancellationToken) -> Self {
        Self {
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            exhausted: AtomicBool::new(false),
            scope: run.child_token(),
        }
    }

    /// Marks the queue exhausted and cancels the scope.
    ///
    /// Returns `true` only for the first caller.
    pub fn declare_exhausted(&self) -> bool {
        let first = !self.exhausted.swap(true, Ordering::AcqRel);
        if first {
            self.scope.cancel();
        }
        first
    }

    /// Whether exhaustion has been declared.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Acquire)
    }

    /// Scope observed by every pop.
    pub fn scope(&self) -> &CancellationToken {
        &self.scope
    }

    /// Records a successful item and returns the new total.
    pub fn record_success(&self) -> u64 {
        self.succeeded.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Records an isolated item failure and returns the new total.
    pub fn record_failure(&self) -> u64 {
        self.failed.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Items processed successfully so far.
    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Acquire)
    }

    /// Items abandoned so far.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Acquire)
    }

    fn report(&self) -> DrainReport {
        DrainReport {
            succeeded: self.succeeded(),
            failed: self.failed(),
        }
    }
}

/// Counts of a drain that terminated without transport error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Items completed successfully.
    pub succeeded: u64,
    /// Items abandoned after retries (isolated).
    pub failed: u64,
}

impl DrainReport {
    /// Whether a post-run hold window applies (at least one success).
    pub fn should_hold(&self) -> bool {
        self.succeeded > 0
    }
}

/// Why a worker left its polling loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stop {
    Exhausted,
    Cancelled,
}

impl Stop {
    fn as_str(self) -> &'static str {
        match self {
            Stop::Exhausted => "exhausted",
            Stop::Cancelled => "cancelled",
        }
    }
}

/// Drains a [`WorkQueue`] with a fixed number of workers.
pub struct QueueDrainCoordinator {
    queue: Arc<dyn WorkQueue>,
    workers: usize,
    wait: Duration,
    retry: RetryExecutor,
}

impl QueueDrainCoordinator {
    /// Creates a coordinator with `workers` loops (min 1) popping with `wait`.
    pub fn new(
        queue: Arc<dyn WorkQueue>,
        workers: usize,
        wait: Duration,
        retry: RetryExecutor,
    ) -> Self {
        Self {
            queue,
            workers: workers.max(1),
            wait,
            retry,
        }
    }

    /// Drains the queue until exhaustion, transport failure or cancellation.
    ///
    /// ### Returns
    /// - `Ok(report)` once every worker stopped without transport error;
    /// - `Err(RunError::Transport)` for the first transport failure;
    /// - `Err(RunError::Cancelled)` if the run token fired.
    pub async fn run(
        &self,
        processor: ProcessorRef,
        token: &CancellationToken,
    ) -> Result<DrainReport, RunError> {
        let pending = self.queue.pending().await?;
        if pending == 0 {
            tracing::info!(queue = self.queue.name(), "queue empty, nothing to drain");
            return Ok(DrainReport::default());
        }
        tracing::info!(
            queue = self.queue.name(),
            pending,
            workers = self.workers,
            "draining queue"
        );

        let state = Arc::new(DrainState::new(token));
        let mut set: JoinSet<Result<(), RunError>> = JoinSet::new();

        for n in 0..self.workers {
            let worker = Worker {
                name: format!("{}-worker-{n}", self.queue.name()),
                queue: Arc::clone(&self.queue),
                wait: self.wait,
                retry: self.retry.clone(),
                processor: Arc::clone(&processor),
                state: Arc::clone(&state),
                run: token.clone(),
            };
            set.spawn(worker.run());
        }

        let mut first_error: Option<RunError> = None;
        while let Some(joined) = set.join_next().await {
            let res = match joined {
                Ok(res) => res,
                Err(join_err) => Err(RunError::WorkerPanicked {
                    error: join_err.to_string(),
                }),
            };
            if let Err(e) = res {
                state.scope().cancel();
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        if token.is_cancelled() {
            return Err(RunError::Cancelled);
        }

        let report = state.report();
        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "queue drained"
        );
        Ok(report)
    }
}

/// One polling loop.
struct Worker {
    name: String,
    queue: Arc<dyn WorkQueue>,
    wait: Duration,
    retry: RetryExecutor,
    processor: ProcessorRef,
    state: Arc<DrainState>,
    run: CancellationToken,
}

impl Worker {
    async fn run(self) -> Result<(), RunError> {
        let res = self.poll_loop().await;
        let reason = match &res {
            Ok(stop) => stop.as_str(),
            Err(_) => "transport",
        };
        self.retry.bus().publish(
            Event::new(EventKind::WorkerStopped)
                .with_subject(self.name.as_str())
                .with_reason(reason),
        );
        res.map(|_| ())
    }

    async fn poll_loop(&self) -> Result<Stop, RunError> {
        loop {
            let popped = select! {
                biased;
                _ = self.state.scope().cancelled() => {
                    return Ok(if self.state.is_exhausted() { Stop::Exhausted } else { Stop::Cancelled });
                }
                r = self.queue.pop(self.wait) => r,
            };

            let payload = match popped {
                Ok(Some(payload)) => payload,
                Ok(None) => {
                    if self.state.declare_exhausted() {
                        self.retry.bus().publish(
                            Event::new(EventKind::QueueExhausted).with_subject(self.name.as_str()),
                        );
                    }
                    return Ok(Stop::Exhausted);
                }
                Err(e) => {
                    self.state.scope().cancel();
                    return Err(e.into());
                }
            };

            let item = WorkItem::from_payload(payload);
            let res = self
                .retry
                .execute(item.id(), &self.run, |_| {
                    self.processor.process(&item, &self.run)
                })
                .await;

            match res {
                Ok(()) => {
                    self.state.record_success();
                    self.retry
                        .bus()
                        .publish(Event::new(EventKind::ItemCompleted).with_subject(item.id()));
                }
                Err(ProcessError::Canceled) => return Ok(Stop::Cancelled),
                Err(e) => {
                    self.state.record_failure();
                    tracing::warn!(worker = %self.name, item = item.id(), error = %e, "item abandoned, continuing");
                    self.retry.bus().publish(
                        Event::new(EventKind::ItemAbandoned)
                            .with_subject(item.id())
                            .with_reason(e.to_string()),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Bus;
    use crate::items::QueueError;
    use crate::policies::{BackoffPolicy, RetryPolicy};
    use crate::processor::ProcessorFn;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    /// In-memory queue; an empty pop sleeps for the wait like a real BRPOP.
    struct MemQueue {
        items: Mutex<VecDeque<String>>,
        pops: AtomicUsize,
        empty: AtomicUsize,
        after_empty: AtomicUsize,
        fail_pops: bool,
    }

    impl MemQueue {
        fn seeded(n: usize) -> Arc<Self> {
            Arc::new(Self {
                items: Mutex::new((0..n).map(|i| format!("/in/input-{i}.txt")).collect()),
                pops: AtomicUsize::new(0),
                empty: AtomicUsize::new(0),
                after_empty: AtomicUsize::new(0),
                fail_pops: false,
            })
        }

        fn broken(n: usize) -> Arc<Self> {
            Arc::new(Self {
                items: Mutex::new((0..n).map(|i| format!("p{i}")).collect()),
                pops: AtomicUsize::new(0),
                empty: AtomicUsize::new(0),
                after_empty: AtomicUsize::new(0),
                fail_pops: true,
            })
        }
    }

    #[async_trait]
    impl WorkQueue for MemQueue {
        fn name(&self) -> &str {
            "mem"
        }

        async fn pending(&self) -> Result<u64, QueueError> {
            Ok(self.items.lock().unwrap().len() as u64)
        }

        async fn pop(&self, wait: Duration) -> Result<Option<String>, QueueError> {
            self.pops.fetch_add(1, Ordering::SeqCst);
            if self.empty.load(Ordering::SeqCst) > 0 {
                self.after_empty.fetch_add(1, Ordering::SeqCst);
            }
            if self.fail_pops {
                return Err(QueueError::new("pop", "connection reset"));
            }
            let next = self.items.lock().unwrap().pop_front();
            if next.is_none() {
                tokio::time::sleep(wait).await;
                self.empty.fetch_add(1, Ordering::SeqCst);
            }
            Ok(next)
        }
    }

    fn coordinator(queue: Arc<dyn WorkQueue>, workers: usize) -> QueueDrainCoordinator {
        let policy = RetryPolicy::new(
            2,
            BackoffPolicy::doubling(Duration::from_millis(1), Duration::from_millis(2)),
        );
        QueueDrainCoordinator::new(
            queue,
            workers,
            Duration::from_millis(50),
            RetryExecutor::new(policy, Bus::new(1024)),
        )
    }

    fn counting(done: Arc<AtomicUsize>) -> ProcessorRef {
        ProcessorFn::arc(move |_item: WorkItem, _t: CancellationToken| {
            let done = done.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn drains_every_item_and_terminates() {
        for m in [0usize, 1, 50] {
            for w in [1usize, 4] {
                let queue = MemQueue::seeded(m);
                let done = Arc::new(AtomicUsize::new(0));

                let report = coordinator(queue.clone(), w)
                    .run(counting(done.clone()), &CancellationToken::new())
                    .await
                    .unwrap();

                assert_eq!(done.load(Ordering::SeqCst), m, "m={m} w={w}");
                assert_eq!(report.succeeded, m as u64, "m={m} w={w}");
                assert_eq!(report.failed, 0);
                assert_eq!(report.should_hold(), m > 0);
            }
        }
    }

    #[tokio::test]
    async fn empty_queue_skips_workers() {
        let queue = MemQueue::seeded(0);
        let done = Arc::new(AtomicUsize::new(0));

        coordinator(queue.clone(), 4)
            .run(counting(done), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(queue.pops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn poisoned_item_is_isolated() {
        let queue = MemQueue::seeded(10);
        let processor = ProcessorFn::arc(|item: WorkItem, _t: CancellationToken| async move {
            if item.id() == "input-3" {
                Err(ProcessError::fail("corrupt"))
            } else {
                Ok(())
            }
        });

        let report = coordinator(queue, 2)
            .run(processor, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report, DrainReport { succeeded: 9, failed: 1 });
    }

    #[tokio::test]
    async fn transport_error_is_terminal() {
        let queue = MemQueue::broken(3);
        let done = Arc::new(AtomicUsize::new(0));

        let err = coordinator(queue, 3)
            .run(counting(done.clone()), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::Transport { phase: "pop", .. }));
        assert_eq!(done.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhaustion_fires_once_and_stops_siblings() {
        let queue = MemQueue::seeded(1);
        let exec = coordinator(queue.clone(), 4);
        let mut rx = exec.retry.bus().subscribe();

        exec.run(counting(Arc::new(AtomicUsize::new(0))), &CancellationToken::new())
            .await
            .unwrap();

        let mut exhausted = 0;
        let mut stopped = 0;
        while let Ok(ev) = rx.try_recv() {
            match ev.kind {
                EventKind::QueueExhausted => exhausted += 1,
                EventKind::WorkerStopped => {
                    stopped += 1;
                    assert_eq!(ev.reason.as_deref(), Some("exhausted"));
                }
                _ => {}
            }
        }
        assert_eq!(exhausted, 1);
        assert_eq!(stopped, 4);

        let empty = queue.empty.load(Ordering::SeqCst);
        assert!((1..=4).contains(&empty), "empty pops: {empty}");
        assert_eq!(queue.after_empty.load(Ordering::SeqCst), 0);
        assert!(queue.pops.load(Ordering::SeqCst) <= 5);
    }

    #[tokio::test]
    async fn run_cancellation_is_reported() {
        let queue = MemQueue::seeded(5);
        let token = CancellationToken::new();
        let t = token.clone();
        let processor = ProcessorFn::arc(move |_item: WorkItem, _tok: CancellationToken| {
            let t = t.clone();
            async move {
                t.cancel();
                Ok(())
            }
        });

        let err = coordinator(queue, 1).run(processor, &token).await.unwrap_err();
        assert!(matches!(err, RunError::Cancelled));
    }

    #[test]
    fn declare_exhausted_is_single_fire() {
        let run = CancellationToken::new();
        let state = DrainState::new(&run);

        assert!(state.declare_exhausted());
        assert!(!state.declare_exhausted());
        assert!(state.scope().is_cancelled());
        assert!(!run.is_cancelled());
    }

    #[test]
    fn run_token_cancels_scope() {
        let run = CancellationToken::new();
        let state = DrainState::new(&run);
        run.cancel();
        assert!(state.scope().is_cancelled());
        assert!(!state.is_exhausted());
    }
}
