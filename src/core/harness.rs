//! # Harness: owns one run from start to exit status.
//!
//! The [`Harness`] owns the event bus, the [`SubscriberSet`] and the run
//! [`Config`]. It creates the run-wide cancellation token, forwards events to
//! subscribers, watches OS signals, and dispatches the configured mode.
//!
//! ## Architecture
//! ```text
//! Harness::run()
//!   ├─► listener:  Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   ├─► watcher:   shutdown_signal() ─► publish(ShutdownRequested) ─► token.cancel()
//!   ├─► modes::dispatch(RunContext{ config, bus, token })
//!   │      indexed │ fixed │ peer │ queue
//!   └─► teardown:  stop watcher ─► drop bus senders ─► listener drains ─► SubscriberSet::shutdown
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use jobvisor::{Config, Harness, LogWriter, Subscribe};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cfg = Config::from_env().unwrap();
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let harness = Harness::builder(cfg)
//!         .with_subscribers(subs)
//!         .build();
//!     let _ = harness.run().await;
//! }
//! ```

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::builder::HarnessBuilder;
use crate::core::signals::shutdown_signal;
use crate::error::RunError;
use crate::events::{Bus, Event, EventKind};
use crate::modes::{self, RunContext};
use crate::subscribers::SubscriberSet;

/// Runs one configured job.
pub struct Harness {
    cfg: Config,
    bus: Bus,
    subs: SubscriberSet,
    watch_signals: bool,
}

impl Harness {
    /// Starts building a harness for `cfg`.
    pub fn builder(cfg: Config) -> HarnessBuilder {
        HarnessBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        subs: SubscriberSet,
        watch_signals: bool,
    ) -> Self {
        Self {
            cfg,
            bus,
            subs,
            watch_signals,
        }
    }

    /// The run configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// The event bus (subscribe before `run` to observe a run).
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runs until the mode finishes or a termination signal arrives.
    pub async fn run(self) -> Result<(), RunError> {
        self.run_with_token(CancellationToken::new()).await
    }

    /// Runs under an externally owned cancellation token.
    pub async fn run_with_token(self, token: CancellationToken) -> Result<(), RunError> {
        let Self {
            cfg,
            bus,
            subs,
            watch_signals,
        } = self;

        let listener = subscriber_listener(&bus, subs);
        let watcher = watch_signals.then(|| signal_watcher(bus.clone(), token.clone()));

        let ctx = RunContext::new(cfg, bus, token);
        let res = modes::dispatch(&ctx).await;
        match &res {
            Ok(()) => tracing::info!(mode = %ctx.config.mode, "run finished"),
            Err(e) => tracing::error!(label = e.as_label(), "run failed: {}", e.as_message()),
        }

        if let Some(watcher) = watcher {
            watcher.abort();
            settle(watcher, "signal watcher").await;
        }
        drop(ctx);
        settle(listener, "subscriber listener").await;
        res
    }
}

/// Awaits a background task; returns `false` (and logs) if it panicked.
async fn settle(task: JoinHandle<()>, what: &'static str) -> bool {
    match task.await {
        Ok(()) => true,
        Err(e) if e.is_cancelled() => true,
        Err(e) => {
            tracing::warn!(task = what, error = %e, "background task failed");
            false
        }
    }
}

/// Forwards bus events to subscribers until every sender is gone.
fn subscriber_listener(bus: &Bus, subs: SubscriberSet) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => subs.emit(&ev),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber listener lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
        subs.shutdown().await;
    })
}

/// Cancels `token` on the first termination signal.
fn signal_watcher(bus: Bus, token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(signal) => {
                tracing::debug!(signal, "termination signal received");
                bus.publish(Event::new(EventKind::ShutdownRequested).with_reason(signal));
                token.cancel();
            }
            Err(e) => tracing::error!(error = %e, "cannot listen for termination signals"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunMode;
    use crate::subscribers::Subscribe;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().unwrap().push(ev.kind);
        }
    }

    fn fixed_config(dir: &std::path::Path, items: Vec<String>) -> Config {
        Config {
            mode: RunMode::Fixed,
            items,
            input_dir: dir.to_path_buf(),
            output_dir: dir.to_path_buf(),
            retry_max: 1,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn subscribers_see_run_events_before_run_returns() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        std::fs::write(dir.join("a.txt"), "a").unwrap();
        let cfg = fixed_config(dir, vec![dir.join("a.txt").display().to_string()]);

        let recorder = Arc::new(Recorder::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![recorder.clone()];
        Harness::builder(cfg)
            .with_subscribers(subs)
            .without_signals()
            .build()
            .run()
            .await
            .unwrap();

        let kinds = recorder.0.lock().unwrap().clone();
        assert!(kinds.contains(&EventKind::AttemptStarting));
        assert!(kinds.contains(&EventKind::ItemCompleted));
    }

    #[tokio::test]
    async fn settle_reports_panicked_tasks_only() {
        assert!(settle(tokio::spawn(async {}), "ok").await);

        let aborted = tokio::spawn(std::future::pending::<()>());
        aborted.abort();
        assert!(settle(aborted, "aborted").await);

        let panicked = tokio::spawn(async {
            panic!("listener failure");
        });
        assert!(!settle(panicked, "panicked").await);
    }

    #[tokio::test]
    async fn cancelled_token_ends_run_as_cancelled() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let cfg = fixed_config(dir, vec!["x".into()]);
        let token = CancellationToken::new();
        token.cancel();

        let err = Harness::builder(cfg)
            .without_signals()
            .build()
            .run_with_token(token)
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 130);
    }
}
