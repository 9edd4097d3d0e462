//! # Runtime events emitted by executors, pools and the peer path.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Attempt events**: one unit of work being tried (starting, failed, backoff)
//! - **Item events**: terminal outcome of an item (completed, abandoned)
//! - **Run events**: queue exhaustion, peer resolution, handshake, hold, shutdown
//!
//! The [`Event`] struct carries optional metadata such as the subject name,
//! attempt number, reason and delay.
//!
//! ## Ordering guarantees
//! Each event has a process-wide sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use jobvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_subject("file-3")
//!     .with_reason("connection refused")
//!     .with_attempt(2)
//!     .with_delay(Duration::from_millis(400));
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.subject.as_deref(), Some("file-3"));
//! assert_eq!(ev.delay_ms, Some(400));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Run events ===
    /// Shutdown requested (OS signal observed).
    ShutdownRequested,

    /// A drain worker observed an empty queue and declared exhaustion.
    ///
    /// Sets:
    /// - `subject`: worker name
    QueueExhausted,

    /// A drain worker left its polling loop.
    ///
    /// Sets:
    /// - `subject`: worker name
    /// - `reason`: why it stopped (`exhausted`, `cancelled`, `transport`)
    WorkerStopped,

    /// Peer group reached the requested cohort size.
    ///
    /// Sets:
    /// - `subject`: group name
    /// - `count`: number of peers resolved
    PeersResolved,

    /// Ring successor answered the handshake.
    ///
    /// Sets:
    /// - `subject`: target URL
    /// - `attempt`: attempt that succeeded
    HandshakeAccepted,

    /// Post-success hold window started.
    ///
    /// Sets:
    /// - `delay_ms`: hold duration
    HoldStarted,

    // === Attempt events ===
    /// An attempt is about to run.
    ///
    /// Sets:
    /// - `subject`: item id or operation label
    /// - `attempt`: attempt number (1-based)
    AttemptStarting,

    /// An attempt failed; no further attempts will be made.
    ///
    /// Sets:
    /// - `subject`, `attempt`, `reason`
    AttemptFailed,

    /// Next attempt scheduled after a failure.
    ///
    /// Sets:
    /// - `subject`: item id or operation label
    /// - `attempt`: failed attempt number
    /// - `delay_ms`: wait before the next attempt
    /// - `reason`: failure message
    BackoffScheduled,

    // === Item events ===
    /// Item processed successfully.
    ///
    /// Sets:
    /// - `subject`: item id
    ItemCompleted,

    /// Item failed permanently (retries exhausted or fatal error).
    ///
    /// Sets:
    /// - `subject`: item id
    /// - `reason`: last error
    ItemAbandoned,
}

impl EventKind {
    /// Stable snake_case label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ShutdownRequested => "shutdown_requested",
            EventKind::QueueExhausted => "queue_exhausted",
            EventKind::WorkerStopped => "worker_stopped",
            EventKind::PeersResolved => "peers_resolved",
            EventKind::HandshakeAccepted => "handshake_accepted",
            EventKind::HoldStarted => "hold_started",
            EventKind::AttemptStarting => "attempt_starting",
            EventKind::AttemptFailed => "attempt_failed",
            EventKind::BackoffScheduled => "backoff_scheduled",
            EventKind::ItemCompleted => "item_completed",
            EventKind::ItemAbandoned => "item_abandoned",
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Item id, worker name, group or target the event is about.
    pub subject: Option<Arc<str>>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Delay in milliseconds (backoff or hold).
    pub delay_ms: Option<u32>,
    /// Generic counter (e.g. peers resolved).
    pub count: Option<u64>,
    /// Human-readable reason (errors, stop causes).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            subject: None,
            attempt: None,
            delay_ms: None,
            count: None,
            reason: None,
        }
    }

    /// Attaches the subject name.
    #[inline]
    pub fn with_subject(mut self, subject: impl Into<Arc<str>>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a counter.
    #[inline]
    pub fn with_count(mut self, n: u64) -> Self {
        self.count = Some(n);
        self
    }
}
