//! # Run modes.
//!
//! Each mode wires the runtime pieces for one kind of job:
//!
//! | mode      | item source                  | engine                   | hold on success |
//! |-----------|------------------------------|--------------------------|-----------------|
//! | `indexed` | `input-{index:02}.txt`       | [`RetryExecutor`]        | yes             |
//! | `fixed`   | `ITEMS` + `ITEMS_FILE`       | [`WorkerPool`]           | no              |
//! | `peer`    | ring successor               | [`HandshakeClient`]      | yes             |
//! | `queue`   | Redis list                   | [`QueueDrainCoordinator`]| if ≥1 success   |
//!
//! [`WorkerPool`]: crate::WorkerPool
//! [`HandshakeClient`]: crate::HandshakeClient
//! [`QueueDrainCoordinator`]: crate::QueueDrainCoordinator

mod fixed;
mod indexed;
mod peer;
mod queue;

use tokio_util::sync::CancellationToken;

use crate::config::{Config, RunMode};
use crate::core::{RetryExecutor, hold};
use crate::error::RunError;
use crate::events::Bus;

/// Everything a mode needs from the harness.
pub(crate) struct RunContext {
    pub config: Config,
    pub bus: Bus,
    pub token: CancellationToken,
}

impl RunContext {
    pub fn new(config: Config, bus: Bus, token: CancellationToken) -> Self {
        Self { config, bus, token }
    }

    /// Retry executor for the configured policy.
    pub fn retry(&self) -> RetryExecutor {
        RetryExecutor::new(self.config.retry_policy(), self.bus.clone())
    }

    /// Post-success hold window (no-op when unset).
    pub async fn hold(&self) {
        if let Some(d) = self.config.hold() {
            tracing::info!(hold_for = ?d, "holding after success");
            hold(&self.bus, &self.token, d).await;
        }
    }
}

/// Runs the configured mode to completion.
pub(crate) async fn dispatch(ctx: &RunContext) -> Result<(), RunError> {
    tracing::info!(mode = %ctx.config.mode, "run starting");
    match ctx.config.mode {
        RunMode::Indexed => indexed::run(ctx).await,
        RunMode::Fixed => fixed::run(ctx).await,
        RunMode::Peer => peer::run(ctx).await,
        RunMode::Queue => queue::run(ctx).await,
    }
}

