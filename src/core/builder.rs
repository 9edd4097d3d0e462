use std::sync::Arc;

use crate::{
    config::Config,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};
use super::harness::Harness;

/// Builder for constructing a [`Harness`].
pub struct HarnessBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    watch_signals: bool,
}

impl HarnessBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            watch_signals: true,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (attempts, item outcomes, peer and
    /// queue milestones) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Disables OS signal handling (embedding, tests); cancel through
    /// [`Harness::run_with_token`] instead.
    pub fn without_signals(mut self) -> Self {
        self.watch_signals = false;
        self
    }

    /// Builds the harness.
    ///
    /// Spawns subscriber workers, so it must be called inside a tokio runtime.
    pub fn build(self) -> Harness {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers);
        Harness::new_internal(self.cfg, bus, subs, self.watch_signals)
    }
}
