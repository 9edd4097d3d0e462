//! # Remote work queue.
//!
//! [`WorkQueue`] is the interface the drain coordinator consumes: a blocking
//! pop with a bounded wait and a size query. [`RedisQueue`] implements it over
//! a Redis list (`BRPOP` / `LLEN`).
//!
//! ## Connections
//! `BRPOP` blocks the connection it runs on, so concurrent workers must not
//! share one. [`RedisQueue`] keeps a small pool of idle connections: a pop
//! checks one out, and returns it only if the command completed. A pop that
//! is dropped mid-wait (cancellation) drops its connection with it.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use thiserror::Error;

use crate::error::RunError;

/// Transport-level queue failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{op}: {message}")]
pub struct QueueError {
    /// Operation that failed (`connect`, `len`, `pop`).
    pub op: &'static str,
    /// The underlying error message.
    pub message: String,
}

impl QueueError {
    /// Creates an error for operation `op`.
    pub fn new(op: &'static str, message: impl Into<String>) -> Self {
        Self {
            op,
            message: message.into(),
        }
    }
}

impl From<QueueError> for RunError {
    fn from(e: QueueError) -> Self {
        RunError::Transport {
            phase: e.op,
            error: e.message,
        }
    }
}

/// A remote FIFO/LIFO of raw payloads.
#[async_trait]
pub trait WorkQueue: Send + Sync + 'static {
    /// Human-readable queue name (for logs).
    fn name(&self) -> &str;

    /// Number of payloads currently waiting.
    async fn pending(&self) -> Result<u64, QueueError>;

    /// Pops one payload, waiting at most `wait`.
    ///
    /// Returns `Ok(None)` when the wait elapsed with nothing to pop.
    async fn pop(&self, wait: Duration) -> Result<Option<String>, QueueError>;
}

/// Redis list used as a work queue.
pub struct RedisQueue {
    client: redis::Client,
    key: String,
    idle: Mutex<Vec<MultiplexedConnection>>,
}

impl RedisQueue {
    /// Opens a client for `url` (`redis://host:port[/db]` or bare `host:port`)
    /// and list `key`. No connection is made until first use.
    pub fn open(url: &str, key: impl Into<String>) -> Result<Self, QueueError> {
        let client = redis::Client::open(normalize_url(url))
            .map_err(|e| QueueError::new("connect", e.to_string()))?;
        Ok(Self {
            client,
            key: key.into(),
            idle: Mutex::new(Vec::new()),
        })
    }

    async fn checkout(&self) -> Result<MultiplexedConnection, QueueError> {
        let cached = self.idle.lock().ok().and_then(|mut idle| idle.pop());
        if let Some(conn) = cached {
            return Ok(conn);
        }
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::new("connect", e.to_string()))
    }

    fn checkin(&self, conn: MultiplexedConnection) {
        if let Ok(mut idle) = self.idle.lock() {
            idle.push(conn);
        }
    }
}

#[async_trait]
impl WorkQueue for RedisQueue {
    fn name(&self) -> &str {
        &self.key
    }

    async fn pending(&self) -> Result<u64, QueueError> {
        let mut conn = self.checkout().await?;
        let len: u64 = redis::cmd("LLEN")
            .arg(&self.key)
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::new("len", e.to_string()))?;
        self.checkin(conn);
        Ok(len)
    }

    async fn pop(&self, wait: Duration) -> Result<Option<String>, QueueError> {
        let mut conn = self.checkout().await?;
        // BRPOP treats 0 as "block forever"; keep the wait bounded.
        let secs = wait.as_secs_f64().max(0.01);
        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(&self.key)
            .arg(secs)
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::new("pop", e.to_string()))?;
        self.checkin(conn);
        Ok(popped.map(|(_key, payload)| payload))
    }
}

/// Accepts `redis://…`, `rediss://…`, `unix://…` or a bare `host:port`.
fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.contains("://") {
        url.to_string()
    } else {
        format!("redis://{url}")
    }
}
