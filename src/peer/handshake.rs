//! # RingHandshakeClient: notify the ring successor.
//!
//! Sends `POST http://<target>:<port>/ping` with `{"from": "<identity>"}` and
//! treats any 2xx as success. Each request has its own timeout; the whole
//! exchange is retried through the [`RetryExecutor`].
//!
//! | outcome                | attempt error          | retried |
//! |------------------------|------------------------|---------|
//! | 2xx                    | -                      | -       |
//! | non-2xx status         | `ProcessError::Fail`   | yes     |
//! | connect / read failure | `ProcessError::Fail`   | yes     |
//! | request timeout        | `ProcessError::Timeout`| yes     |
//! | run cancelled          | `ProcessError::Canceled`| no     |

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::core::RetryExecutor;
use crate::error::{ProcessError, RunError};
use crate::events::{Event, EventKind};

/// Per-request timeout.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Handshake body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    /// Sender identity (ring index or address).
    pub from: String,
}

/// HTTP client for ring handshakes.
#[derive(Clone)]
pub struct HandshakeClient {
    http: reqwest::Client,
    port: u16,
    retry: RetryExecutor,
}

impl HandshakeClient {
    /// Creates a client targeting `port` on every peer.
    pub fn new(port: u16, retry: RetryExecutor) -> Self {
        Self {
            http: reqwest::Client::new(),
            port,
            retry,
        }
    }

    /// URL used to reach `target`; IPv6 literals are bracketed.
    ///
    /// ```
    /// use jobvisor::HandshakeClient;
    ///
    /// assert_eq!(HandshakeClient::url_for("fd00::2", 8080), "http://[fd00::2]:8080/ping");
    /// assert_eq!(HandshakeClient::url_for("job-1.svc", 8080), "http://job-1.svc:8080/ping");
    /// ```
    pub fn url_for(target: &str, port: u16) -> String {
        match target.parse::<IpAddr>() {
            Ok(IpAddr::V6(v6)) => format!("http://[{v6}]:{port}/ping"),
            _ => format!("http://{target}:{port}/ping"),
        }
    }

    /// Sends the handshake to `target`, retrying per policy.
    ///
    /// ### Errors
    /// - [`RunError::HandshakeFailed`] with the URL and last attempt's error;
    /// - [`RunError::Cancelled`] if the run was cancelled.
    pub async fn handshake(
        &self,
        target: &str,
        identity: &str,
        token: &CancellationToken,
    ) -> Result<(), RunError> {
        let url = Self::url_for(target, self.port);
        let body = Handshake {
            from: identity.to_string(),
        };

        let res = self
            .retry
            .execute(&url, token, |attempt| self.attempt(&url, &body, attempt, token))
            .await;

        match res {
            Ok(attempt) => {
                self.retry.bus().publish(
                    Event::new(EventKind::HandshakeAccepted)
                        .with_subject(url.as_str())
                        .with_attempt(attempt),
                );
                Ok(())
            }
            Err(ProcessError::Canceled) => Err(RunError::Cancelled),
            Err(source) => Err(RunError::HandshakeFailed {
                target: url,
                source,
            }),
        }
    }

    async fn attempt(
        &self,
        url: &str,
        body: &Handshake,
        attempt: u32,
        token: &CancellationToken,
    ) -> Result<u32, ProcessError> {
        let send = self
            .http
            .post(url)
            .timeout(HANDSHAKE_TIMEOUT)
            .json(body)
            .send();

        let resp = select! {
            biased;
            _ = token.cancelled() => return Err(ProcessError::Canceled),
            r = send => r.map_err(|e| {
                if e.is_timeout() {
                    ProcessError::Timeout { timeout: HANDSHAKE_TIMEOUT }
                } else {
                    ProcessError::fail(e.to_string())
                }
            })?,
        };

        let status = resp.status();
        if status.is_success() {
            Ok(attempt)
        } else {
            Err(ProcessError::fail(format!("unexpected status {status}")))
        }
    }
}
