//! # SubscriberSet: fan-out of run events
//!
//! Each subscriber gets its own bounded lane (queue + worker task), so a slow
//! log sink never delays the retry loop that published the event.
//!
//! - `emit` never awaits; a full lane drops the event for that subscriber only.
//! - Order is preserved per lane, not across lanes.
//! - A panicking handler is logged and the lane keeps running.
//!
//! ```text
//!  emit(&Event) ──► Arc<Event> ──┬──► lane "log"    ─► on_event()
//!                                └──► lane "custom" ─► on_event()
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::events::Event;

use super::Subscribe;

struct Lane {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
    worker: JoinHandle<()>,
}

impl Lane {
    fn spawn(sub: Arc<dyn Subscribe>) -> Self {
        let name = sub.name();
        let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));

        let worker = tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                if let Err(panic) = AssertUnwindSafe(sub.on_event(&ev)).catch_unwind().await {
                    tracing::error!(subscriber = name, "subscriber panicked: {:?}", panic);
                }
            }
        });

        Self { name, tx, worker }
    }

    fn offer(&self, ev: &Arc<Event>) {
        let reason = match self.tx.try_send(Arc::clone(ev)) {
            Ok(()) => return,
            Err(TrySendError::Full(_)) => "queue full",
            Err(TrySendError::Closed(_)) => "worker closed",
        };
        tracing::warn!(subscriber = self.name, kind = ev.kind.as_str(), reason, "event dropped");
    }
}

/// Subscribers of one run, each behind its own bounded lane.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
}

impl SubscriberSet {
    /// Spawns one lane per subscriber. Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        Self {
            lanes: subs.into_iter().map(Lane::spawn).collect(),
        }
    }

    /// Offers `event` to every lane without waiting.
    pub fn emit(&self, event: &Event) {
        if self.lanes.is_empty() {
            return;
        }
        let ev = Arc::new(event.clone());
        for lane in &self.lanes {
            lane.offer(&ev);
        }
    }

    /// Closes every lane and waits for queued events to be handled.
    pub async fn shutdown(self) {
        for Lane { tx, worker, .. } in self.lanes {
            drop(tx);
            let _ = worker.await;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }
    }

    struct Panicker;

    #[async_trait]
    impl Subscribe for Panicker {
        async fn on_event(&self, _event: &Event) {
            panic!("subscriber failure");
        }

        fn name(&self) -> &'static str {
            "panicker"
        }
    }

    #[tokio::test]
    async fn panicking_subscriber_does_not_disturb_others() {
        let recorder = Arc::new(Recorder::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Panicker), recorder.clone()];
        let set = SubscriberSet::new(subs);
        assert_eq!(set.len(), 2);

        set.emit(&Event::new(EventKind::ItemCompleted));
        set.emit(&Event::new(EventKind::ItemAbandoned));
        set.shutdown().await;

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![EventKind::ItemCompleted, EventKind::ItemAbandoned]);
    }

    #[tokio::test]
    async fn empty_set_accepts_events() {
        let set = SubscriberSet::new(Vec::new());
        assert!(set.is_empty());
        set.emit(&Event::new(EventKind::QueueExhausted));
        set.shutdown().await;
    }
}
