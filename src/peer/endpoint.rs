//! # Liveness endpoint answering ring handshakes.
//!
//! `GET /ping` and `POST /ping` both answer `200 pong`. A POST body of the
//! form `{"from": "<identity>"}` is logged; anything else is accepted as-is.

use std::net::SocketAddr;

use axum::{Router, routing::get};
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::error::RunError;
use crate::peer::handshake::Handshake;

/// Bound, not yet serving, liveness endpoint.
pub struct LivenessEndpoint {
    listener: TcpListener,
    addr: SocketAddr,
}

impl LivenessEndpoint {
    /// Binds `addr` (port 0 picks a free port).
    pub async fn bind(addr: SocketAddr) -> Result<Self, RunError> {
        let endpoint_err = |e: std::io::Error| RunError::Endpoint {
            addr: addr.to_string(),
            error: e.to_string(),
        };
        let listener = TcpListener::bind(addr).await.map_err(endpoint_err)?;
        let addr = listener.local_addr().map_err(endpoint_err)?;
        Ok(Self { listener, addr })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serves until `token` fires.
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<Result<(), RunError>> {
        let addr = self.addr;
        tracing::info!(%addr, "liveness endpoint listening");
        tokio::spawn(async move {
            axum::serve(self.listener, router())
                .with_graceful_shutdown(token.cancelled_owned())
                .await
                .map_err(|e| RunError::Endpoint {
                    addr: addr.to_string(),
                    error: e.to_string(),
                })
        })
    }
}

fn router() -> Router {
    Router::new().route("/ping", get(pong).post(accept))
}

async fn pong() -> &'static str {
    "pong"
}

async fn accept(body: String) -> &'static str {
    match serde_json::from_str::<Handshake>(&body) {
        Ok(hs) => tracing::info!(from = %hs.from, "handshake received"),
        Err(_) => tracing::debug!(bytes = body.len(), "ping received"),
    }
    "pong"
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn start() -> (SocketAddr, CancellationToken, JoinHandle<Result<(), RunError>>) {
        let endpoint = LivenessEndpoint::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = endpoint.local_addr();
        let token = CancellationToken::new();
        let handle = endpoint.spawn(token.clone());
        (addr, token, handle)
    }

    #[tokio::test]
    async fn answers_get_and_post() {
        let (addr, token, handle) = start().await;
        let client = reqwest::Client::new();
        let url = format!("http://{addr}/ping");

        let res = client.get(&url).send().await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::OK);
        assert_eq!(res.text().await.unwrap(), "pong");

        let res = client
            .post(&url)
            .json(&Handshake {
                from: "3".to_string(),
            })
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::OK);

        let res = client.post(&url).body("not json").send().await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::OK);

        token.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn bind_conflict_is_endpoint_error() {
        let (addr, token, _handle) = start().await;
        let err = LivenessEndpoint::bind(addr).await.err().unwrap();
        assert_eq!(err.as_label(), "endpoint_failed");
        token.cancel();
    }
}
