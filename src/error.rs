//! Error types used by the jobvisor runtime and units of work.
//!
//! This module defines two main error enums:
//!
//! - [`RunError`]: errors that end a run (configuration, resolution, transport, items).
//! - [`ProcessError`]: errors raised by a single attempt of a unit of work.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging,
//! and [`ProcessError::is_retryable`] drives the retry executor.

use std::time::Duration;
use thiserror::Error;

/// # Errors that terminate a run.
///
/// Everything here is surfaced to the caller of a run mode. Configuration and
/// resolution errors happen before any worker starts; item and transport errors
/// happen while draining.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RunError {
    /// A configuration value is missing or out of range.
    #[error("invalid configuration `{field}`: {reason}")]
    ConfigInvalid {
        /// Configuration key that failed validation.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The peer group never reached the requested cohort size.
    #[error("peer warm-up timed out after {elapsed:?} (want={want}, found={found})")]
    WarmupTimeout {
        /// Requested minimum cohort size.
        want: usize,
        /// Size of the last resolved set.
        found: usize,
        /// Time spent waiting.
        elapsed: Duration,
    },

    /// The cohort resolved, but our own address is not part of it.
    #[error("self address {identity} not found among {total} resolved peers")]
    SelfNotFound {
        /// Address we looked for.
        identity: String,
        /// Number of peers resolved.
        total: usize,
    },

    /// An item exhausted all retry attempts.
    #[error("item {item} failed permanently: {source}")]
    ItemFailed {
        /// Item identifier.
        item: String,
        /// Last attempt's error.
        #[source]
        source: ProcessError,
    },

    /// Queue transport failed (connection, protocol).
    #[error("queue transport error during {phase}: {error}")]
    Transport {
        /// Operation that failed (`len`, `pop`, `connect`).
        phase: &'static str,
        /// The underlying error message.
        error: String,
    },

    /// Handshake to the ring successor failed after all retries.
    #[error("handshake to {target} failed: {source}")]
    HandshakeFailed {
        /// Target URL.
        target: String,
        /// Last attempt's error.
        #[source]
        source: ProcessError,
    },

    /// The static item source could not be read.
    #[error("item source {path} unreadable: {error}")]
    Source {
        /// Path of the items file.
        path: String,
        /// The underlying error message.
        error: String,
    },

    /// The liveness endpoint could not be started.
    #[error("liveness endpoint on {addr} failed: {error}")]
    Endpoint {
        /// Bind address.
        addr: String,
        /// The underlying error message.
        error: String,
    },

    /// A worker task panicked or was aborted.
    #[error("worker panicked: {error}")]
    WorkerPanicked {
        /// Join error description.
        error: String,
    },

    /// The run was cancelled (shutdown signal).
    #[error("run cancelled")]
    Cancelled,
}

impl RunError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use jobvisor::RunError;
    ///
    /// let err = RunError::Cancelled;
    /// assert_eq!(err.as_label(), "run_cancelled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RunError::ConfigInvalid { .. } => "config_invalid",
            RunError::WarmupTimeout { .. } => "peer_warmup_timeout",
            RunError::SelfNotFound { .. } => "peer_self_not_found",
            RunError::ItemFailed { .. } => "item_failed",
            RunError::Transport { .. } => "queue_transport",
            RunError::HandshakeFailed { .. } => "handshake_failed",
            RunError::Source { .. } => "item_source",
            RunError::Endpoint { .. } => "endpoint_failed",
            RunError::WorkerPanicked { .. } => "worker_panicked",
            RunError::Cancelled => "run_cancelled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RunError::ConfigInvalid { field, reason } => format!("config {field}: {reason}"),
            RunError::WarmupTimeout { want, found, elapsed } => {
                format!("warm-up {elapsed:?}: want={want} found={found}")
            }
            RunError::SelfNotFound { identity, total } => {
                format!("self={identity} absent from {total} peers")
            }
            RunError::ItemFailed { item, source } => format!("item={item} error={source}"),
            RunError::Transport { phase, error } => format!("phase={phase} error={error}"),
            RunError::HandshakeFailed { target, source } => {
                format!("target={target} error={source}")
            }
            RunError::Source { path, error } => format!("path={path} error={error}"),
            RunError::Endpoint { addr, error } => format!("addr={addr} error={error}"),
            RunError::WorkerPanicked { error } => format!("panic: {error}"),
            RunError::Cancelled => "cancelled".to_string(),
        }
    }

    /// Process exit status for this error.
    ///
    /// - `2` for configuration errors;
    /// - `130` for cancellation (interrupted);
    /// - `1` for everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::ConfigInvalid { .. } => 2,
            RunError::Cancelled => 130,
            _ => 1,
        }
    }

    /// Shorthand for building a [`RunError::ConfigInvalid`].
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        RunError::ConfigInvalid {
            field,
            reason: reason.into(),
        }
    }
}

/// # Errors produced by one attempt of a unit of work.
///
/// `Fail` and `Timeout` are transient and retried by the
/// [`RetryExecutor`](crate::RetryExecutor); `Fatal` and `Canceled` end the
/// retry loop at once.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// Attempt exceeded its time limit.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The exceeded limit.
        timeout: Duration,
    },

    /// Non-recoverable error (should not be retried).
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Attempt failed but may succeed if retried.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Attempt or wait was interrupted by run cancellation.
    #[error("context cancelled")]
    Canceled,
}

impl ProcessError {
    /// Shorthand for a retryable failure.
    pub fn fail(error: impl Into<String>) -> Self {
        ProcessError::Fail {
            error: error.into(),
        }
    }

    /// Shorthand for a non-retryable failure.
    pub fn fatal(error: impl Into<String>) -> Self {
        ProcessError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use jobvisor::ProcessError;
    /// use std::time::Duration;
    ///
    /// let err = ProcessError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "process_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ProcessError::Timeout { .. } => "process_timeout",
            ProcessError::Fatal { .. } => "process_fatal",
            ProcessError::Fail { .. } => "process_failed",
            ProcessError::Canceled => "process_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ProcessError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            ProcessError::Fatal { error } => format!("fatal: {error}"),
            ProcessError::Fail { error } => format!("error: {error}"),
            ProcessError::Canceled => "context cancelled".to_string(),
        }
    }

    /// Indicates whether the error type is safe to retry.
    ///
    /// Returns `true` for [`ProcessError::Fail`] and [`ProcessError::Timeout`],
    /// `false` otherwise.
    ///
    /// # Example
    /// ```
    /// use jobvisor::ProcessError;
    ///
    /// assert!(ProcessError::fail("boom").is_retryable());
    /// assert!(!ProcessError::fatal("nope").is_retryable());
    /// assert!(!ProcessError::Canceled.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProcessError::Fail { .. } | ProcessError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_distinguish_config_and_cancel() {
        assert_eq!(RunError::config("MODE", "missing").exit_code(), 2);
        assert_eq!(RunError::Cancelled.exit_code(), 130);
        let item = RunError::ItemFailed {
            item: "val-0".into(),
            source: ProcessError::fail("io"),
        };
        assert_eq!(item.exit_code(), 1);
        assert!(item.to_string().contains("val-0"));
    }

    #[test]
    fn warmup_message_names_minimum_and_elapsed() {
        let err = RunError::WarmupTimeout {
            want: 3,
            found: 1,
            elapsed: Duration::from_secs(1),
        };
        let text = err.to_string();
        assert!(text.contains("want=3"));
        assert!(text.contains("1s"));
        assert_eq!(err.as_label(), "peer_warmup_timeout");
    }
}
