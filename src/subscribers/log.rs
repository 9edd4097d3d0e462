//! # LogWriter: renders runtime events through `tracing`
//!
//! Attempt and backoff chatter goes to `debug`, item outcomes and run
//! milestones to `info`, permanent failures to `warn`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  jobvisor: item completed item=file-0
//! DEBUG jobvisor: backoff scheduled item=file-1 attempt=1 delay_ms=1000 err="execution failed: ..."
//! WARN  jobvisor: item abandoned item=file-1 err="execution failed: ..."
//! INFO  jobvisor: queue exhausted worker=drain-2
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let subject = e.subject.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::ShutdownRequested => {
                tracing::warn!(seq = e.seq, signal = reason, "shutdown requested");
            }
            EventKind::AttemptStarting => {
                tracing::debug!(item = subject, attempt = e.attempt, "attempt starting");
            }
            EventKind::AttemptFailed => {
                tracing::debug!(item = subject, attempt = e.attempt, err = reason, "attempt failed");
            }
            EventKind::BackoffScheduled => {
                tracing::debug!(
                    item = subject,
                    attempt = e.attempt,
                    delay_ms = e.delay_ms,
                    err = reason,
                    "backoff scheduled"
                );
            }
            EventKind::ItemCompleted => {
                tracing::info!(item = subject, "item completed");
            }
            EventKind::ItemAbandoned => {
                tracing::warn!(item = subject, err = reason, "item abandoned");
            }
            EventKind::QueueExhausted => {
                tracing::info!(worker = subject, "queue exhausted");
            }
            EventKind::WorkerStopped => {
                tracing::debug!(worker = subject, cause = reason, "worker stopped");
            }
            EventKind::PeersResolved => {
                tracing::info!(group = subject, peers = e.count, "peers resolved");
            }
            EventKind::HandshakeAccepted => {
                tracing::info!(peer = subject, attempt = e.attempt, "handshake accepted");
            }
            EventKind::HoldStarted => {
                tracing::info!(hold_ms = e.delay_ms, "holding");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
