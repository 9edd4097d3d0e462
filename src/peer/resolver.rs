//! # PeerRingResolver: wait for a peer group to warm up.
//!
//! Polls a name-resolution source for a group until enough distinct peers
//! answer, then returns them as a canonical [`PeerSet`].
//!
//! ## Flow
//! ```text
//! every poll (first tick immediately):
//!   select! {
//!     token.cancelled()  ─► Err(Cancelled)
//!     warm-up deadline   ─► Err(WarmupTimeout{ want, found, elapsed })
//!     source.lookup()    ─► PeerSet::from_addresses
//!                             len >= min ─► publish PeersResolved, Ok(set)
//!                             otherwise  ─► wait for next tick
//!   }
//! ```
//!
//! Lookup errors count as "nobody yet": a group whose members are still
//! starting commonly answers NXDOMAIN.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::error::RunError;
use crate::events::{Bus, Event, EventKind};
use crate::peer::ring::PeerSet;

/// Default interval between lookups.
pub const DEFAULT_POLL: Duration = Duration::from_millis(500);

/// Name-resolution source: group name to zero or more addresses.
#[async_trait]
pub trait Resolve: Send + Sync + 'static {
    /// Resolves `group`. Order of the result is irrelevant.
    async fn lookup(&self, group: &str) -> std::io::Result<Vec<String>>;
}

/// System DNS resolver (A/AAAA records of the group name).
#[derive(Clone, Copy, Debug, Default)]
pub struct DnsResolver;

#[async_trait]
impl Resolve for DnsResolver {
    async fn lookup(&self, group: &str) -> std::io::Result<Vec<String>> {
        let addrs = tokio::net::lookup_host((group, 0)).await?;
        Ok(addrs.map(|sa| sa.ip().to_string()).collect())
    }
}

/// Polls a [`Resolve`] source until the group reaches a minimum size.
#[derive(Clone)]
pub struct PeerRingResolver {
    source: Arc<dyn Resolve>,
    poll: Duration,
    bus: Bus,
}

impl PeerRingResolver {
    /// Creates a resolver over `source` with the default poll interval.
    pub fn new(source: Arc<dyn Resolve>, bus: Bus) -> Self {
        Self {
            source,
            poll: DEFAULT_POLL,
            bus,
        }
    }

    /// Overrides the poll interval.
    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = poll.max(Duration::from_millis(1));
        self
    }

    /// Resolves `group` until it has at least `min` peers or `warmup` elapses.
    ///
    /// ### Errors
    /// - [`RunError::WarmupTimeout`] when the deadline passes first;
    /// - [`RunError::Cancelled`] when `token` fires.
    pub async fn resolve(
        &self,
        group: &str,
        min: usize,
        warmup: Duration,
        token: &CancellationToken,
    ) -> Result<PeerSet, RunError> {
        let min = min.max(1);
        let started = Instant::now();
        let deadline = time::sleep(warmup);
        tokio::pin!(deadline);

        let mut ticker = time::interval(self.poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut found = 0usize;
        loop {
            select! {
                biased;
                _ = token.cancelled() => return Err(RunError::Cancelled),
                _ = &mut deadline => {
                    return Err(RunError::WarmupTimeout { want: min, found, elapsed: started.elapsed() });
                }
                _ = ticker.tick() => {}
            }

            let looked_up = select! {
                biased;
                _ = token.cancelled() => return Err(RunError::Cancelled),
                _ = &mut deadline => {
                    return Err(RunError::WarmupTimeout { want: min, found, elapsed: started.elapsed() });
                }
                r = self.source.lookup(group) => r,
            };

            let set = match looked_up {
                Ok(addrs) => PeerSet::from_addresses(addrs),
                Err(e) => {
                    tracing::debug!(group, error = %e, "peer lookup failed");
                    PeerSet::default()
                }
            };

            if set.len() >= min {
                self.bus.publish(
                    Event::new(EventKind::PeersResolved)
                        .with_subject(group)
                        .with_count(set.len() as u64),
                );
                return Ok(set);
            }
            if set.len() != found {
                tracing::debug!(group, found = set.len(), want = min, "peer group warming up");
            }
            found = set.len();
        }
    }
}
