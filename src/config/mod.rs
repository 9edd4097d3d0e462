//! # Run configuration.
//!
//! Provides [`Config`], the validated settings a run is started with, and
//! [`RunMode`], which selects what the run does.
//!
//! Config is produced in two ways:
//! 1. **Environment**: [`Config::from_env`] (or [`Config::from_lookup`] in tests)
//! 2. **Code**: start from `Config::default()` and set fields
//!
//! ## Sentinel values
//! - `hold_for = 0s` → no hold window after success
//! - `total_peers = 0` → infer the ring size from peer resolution
//! - `job_index = None` → locate self by `self_address` (peer mode)

mod load;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::RunError;
use crate::policies::{BackoffPolicy, JitterPolicy, RetryPolicy};

pub use load::parse_duration;

/// What a run does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunMode {
    /// One item selected by the job index.
    Indexed,
    /// Static item list through the worker pool.
    #[default]
    Fixed,
    /// Ring handshake with the successor peer.
    Peer,
    /// Drain a remote queue.
    Queue,
}

impl RunMode {
    /// Lowercase name as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Indexed => "indexed",
            RunMode::Fixed => "fixed",
            RunMode::Peer => "peer",
            RunMode::Queue => "queue",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "indexed" => Ok(RunMode::Indexed),
            "fixed" => Ok(RunMode::Fixed),
            "peer" => Ok(RunMode::Peer),
            "queue" => Ok(RunMode::Queue),
            other => Err(format!("unknown mode `{other}` (indexed|fixed|peer|queue)")),
        }
    }
}

/// Settings for one run.
///
/// ## Field semantics
/// - `max_concurrency`: pool ceiling / number of drain workers (min 1)
/// - `retry_max`: attempts per item or handshake (min 1)
/// - `retry_backoff` / `retry_backoff_cap`: first delay and cap of the doubling backoff
/// - `queue_wait`: bounded wait of one blocking pop; elapsing means "exhausted"
/// - `min_peers` / `peer_warmup`: cohort size to wait for, and for how long
#[derive(Clone, Debug)]
pub struct Config {
    /// Selected run mode.
    pub mode: RunMode,
    /// Port of the liveness endpoint, and of peers' endpoints.
    pub http_port: u16,
    /// Concurrency ceiling.
    pub max_concurrency: usize,
    /// Attempts per unit of work.
    pub retry_max: u32,
    /// Delay after the first failure.
    pub retry_backoff: Duration,
    /// Maximum backoff delay.
    pub retry_backoff_cap: Duration,
    /// Backoff jitter.
    pub retry_jitter: JitterPolicy,
    /// Explicit item values (fixed mode).
    pub items: Vec<String>,
    /// File with one item per line (fixed mode).
    pub items_file: Option<PathBuf>,
    /// Queue server URL (queue mode).
    pub queue_url: String,
    /// Queue list key (queue mode).
    pub queue_key: Option<String>,
    /// Bounded wait of one pop.
    pub queue_wait: Duration,
    /// Directory inputs are resolved against.
    pub input_dir: PathBuf,
    /// Directory outputs are written to.
    pub output_dir: PathBuf,
    /// This member's index, when injected.
    pub job_index: Option<usize>,
    /// Cohort size (`0` = infer).
    pub total_peers: usize,
    /// Peer group name (headless service).
    pub subdomain: Option<String>,
    /// Minimum cohort size when inferring.
    pub min_peers: usize,
    /// How long to wait for the cohort.
    pub peer_warmup: Duration,
    /// Own address, for self-location when no index is injected.
    pub self_address: Option<String>,
    /// Own hostname (`<base>-<n>` enables per-member target names).
    pub hostname: Option<String>,
    /// Hold window after success (`0s` = none).
    pub hold_for: Duration,
    /// Event bus capacity.
    pub bus_capacity: usize,
}

impl Config {
    /// Retry policy built from the retry fields.
    pub fn retry_policy(&self) -> RetryPolicy {
        let backoff = BackoffPolicy::doubling(self.retry_backoff, self.retry_backoff_cap)
            .with_jitter(self.retry_jitter);
        RetryPolicy::new(self.retry_max, backoff)
    }

    /// Hold window as an `Option` (`None` when zero).
    #[inline]
    pub fn hold(&self) -> Option<Duration> {
        if self.hold_for.is_zero() {
            None
        } else {
            Some(self.hold_for)
        }
    }

    /// Cohort size as an `Option` (`None` when it must be inferred).
    #[inline]
    pub fn fixed_total(&self) -> Option<usize> {
        if self.total_peers == 0 {
            None
        } else {
            Some(self.total_peers)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Checks ranges and the requirements of the selected mode.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.max_concurrency == 0 {
            return Err(RunError::config("MAX_CONCURRENCY", "must be at least 1"));
        }
        if self.retry_max == 0 {
            return Err(RunError::config("RETRY_MAX", "must be at least 1"));
        }
        if self.retry_backoff > self.retry_backoff_cap {
            return Err(RunError::config(
                "RETRY_BACKOFF",
                format!(
                    "{:?} exceeds RETRY_BACKOFF_CAP {:?}",
                    self.retry_backoff, self.retry_backoff_cap
                ),
            ));
        }
        if self.queue_wait.is_zero() {
            return Err(RunError::config("QUEUE_WAIT", "must be positive"));
        }

        match self.mode {
            RunMode::Indexed => {
                if self.job_index.is_none() {
                    return Err(RunError::config("JOB_INDEX", "required in indexed mode"));
                }
            }
            RunMode::Fixed => {
                if self.items.is_empty() && self.items_file.is_none() {
                    return Err(RunError::config(
                        "ITEMS",
                        "fixed mode needs ITEMS or ITEMS_FILE",
                    ));
                }
            }
            RunMode::Peer => {
                if self.subdomain.as_deref().is_none_or(str::is_empty) {
                    return Err(RunError::config("SUBDOMAIN", "required in peer mode"));
                }
                if self.job_index.is_none() && self.self_address.is_none() {
                    return Err(RunError::config(
                        "JOB_INDEX",
                        "peer mode needs JOB_INDEX or SELF_ADDRESS",
                    ));
                }
                if let (Some(idx), Some(total)) = (self.job_index, self.fixed_total()) {
                    if idx >= total {
                        return Err(RunError::config(
                            "JOB_INDEX",
                            format!("{idx} outside ring of TOTAL_PODS={total}"),
                        ));
                    }
                }
                if self.min_peers == 0 {
                    return Err(RunError::config("MIN_PEERS", "must be at least 1"));
                }
            }
            RunMode::Queue => {
                if self.queue_key.as_deref().is_none_or(str::is_empty) {
                    return Err(RunError::config("QUEUE_KEY", "required in queue mode"));
                }
                if self.queue_url.trim().is_empty() {
                    return Err(RunError::config("QUEUE_URL", "required in queue mode"));
                }
            }
        }
        Ok(())
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `mode = fixed`, `http_port = 8080`
    /// - `max_concurrency = 4`, `retry_max = 3`
    /// - `retry_backoff = 1s`, `retry_backoff_cap = 30s`, no jitter
    /// - `queue_url = redis://127.0.0.1:6379`, `queue_wait = 3s`
    /// - `input_dir = /input`, `output_dir = /output`
    /// - `min_peers = 2`, `peer_warmup = 60s`
    /// - `hold_for = 0s`, `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            http_port: 8080,
            max_concurrency: 4,
            retry_max: 3,
            retry_backoff: Duration::from_secs(1),
            retry_backoff_cap: Duration::from_secs(30),
            retry_jitter: JitterPolicy::None,
            items: Vec::new(),
            items_file: None,
            queue_url: "redis://127.0.0.1:6379".to_string(),
            queue_key: None,
            queue_wait: Duration::from_secs(3),
            input_dir: PathBuf::from("/input"),
            output_dir: PathBuf::from("/output"),
            job_index: None,
            total_peers: 0,
            subdomain: None,
            min_peers: 2,
            peer_warmup: Duration::from_secs(60),
            self_address: None,
            hostname: None,
            hold_for: Duration::ZERO,
            bus_capacity: 1024,
        }
    }
}
