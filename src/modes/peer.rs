//! Peer mode: every cohort member notifies its ring successor.
//!
//! ```text
//! bind liveness endpoint ─► plan ring ─► handshake(successor) ─► hold ─► stop endpoint
//! ```
//!
//! The ring is planned without any resolution when index, total and a
//! `<base>-<n>` hostname are all known; otherwise the group is resolved and
//! the missing pieces are taken from the [`PeerSet`].

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::error::RunError;
use crate::modes::RunContext;
use crate::peer::{
    DnsResolver, HandshakeClient, LivenessEndpoint, PeerRingResolver, PeerSet, Resolve,
    RingPosition,
};

static HOST_ORDINAL: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^(.*)-\d+$").ok());

/// Base of a `<base>-<n>` hostname.
fn host_base(hostname: &str) -> Option<String> {
    HOST_ORDINAL
        .as_ref()?
        .captures(hostname)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|b| !b.is_empty())
}

/// Resolved ring: who we are, where we sit, whom we call.
#[derive(Debug, PartialEq, Eq)]
struct Plan {
    identity: String,
    position: RingPosition,
    target: String,
}

pub(crate) async fn run(ctx: &RunContext) -> Result<(), RunError> {
    run_with(ctx, Arc::new(DnsResolver)).await
}

pub(crate) async fn run_with(ctx: &RunContext, source: Arc<dyn Resolve>) -> Result<(), RunError> {
    let cfg = &ctx.config;
    let subdomain = cfg
        .subdomain
        .clone()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RunError::config("SUBDOMAIN", "required in peer mode"))?;

    let endpoint_token = ctx.token.child_token();
    let endpoint =
        LivenessEndpoint::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, cfg.http_port))).await?;
    let server = endpoint.spawn(endpoint_token.clone());

    let res = handshake_successor(ctx, source, &subdomain).await;

    endpoint_token.cancel();
    match server.await {
        Ok(Err(e)) => tracing::warn!(error = %e, "liveness endpoint stopped with error"),
        Err(e) => tracing::warn!(error = %e, "liveness endpoint task failed"),
        Ok(Ok(())) => {}
    }
    res
}

async fn handshake_successor(
    ctx: &RunContext,
    source: Arc<dyn Resolve>,
    subdomain: &str,
) -> Result<(), RunError> {
    let plan = plan(ctx, source, subdomain).await?;
    tracing::info!(
        identity = %plan.identity,
        ring = %plan.position,
        successor = %plan.target,
        "ring planned"
    );

    HandshakeClient::new(ctx.config.http_port, ctx.retry())
        .handshake(&plan.target, &plan.identity, &ctx.token)
        .await?;

    tracing::info!(successor = %plan.target, "successor acknowledged");
    ctx.hold().await;
    Ok(())
}

async fn plan(ctx: &RunContext, source: Arc<dyn Resolve>, subdomain: &str) -> Result<Plan, RunError> {
    let cfg = &ctx.config;
    let base = cfg.hostname.as_deref().and_then(host_base);

    if let (Some(index), Some(total), Some(base)) = (cfg.job_index, cfg.fixed_total(), &base) {
        let position = RingPosition::new(index, total)?;
        return Ok(Plan {
            identity: index.to_string(),
            target: member_name(base, position.successor(), subdomain),
            position,
        });
    }

    let want = cfg.fixed_total().unwrap_or(cfg.min_peers);
    let peers = PeerRingResolver::new(source, ctx.bus.clone())
        .resolve(subdomain, want, cfg.peer_warmup, &ctx.token)
        .await?;
    tracing::info!(peers = ?peers.as_slice(), "peer group resolved");

    plan_from_peers(ctx, &peers, base.as_deref(), subdomain)
}

fn plan_from_peers(
    ctx: &RunContext,
    peers: &PeerSet,
    base: Option<&str>,
    subdomain: &str,
) -> Result<Plan, RunError> {
    let cfg = &ctx.config;
    let (identity, index) = match (cfg.job_index, cfg.self_address.as_deref()) {
        (Some(index), _) => (index.to_string(), index),
        (None, Some(addr)) => (addr.to_string(), peers.position_of(addr)?),
        (None, None) => {
            return Err(RunError::config(
                "JOB_INDEX",
                "peer mode needs JOB_INDEX or SELF_ADDRESS",
            ));
        }
    };
    let total = cfg.fixed_total().unwrap_or(peers.len());
    let position = RingPosition::new(index, total)?;

    let target = match (base, cfg.job_index) {
        (Some(base), Some(_)) => member_name(base, position.successor(), subdomain),
        _ => peers
            .get(position.successor())
            .map(str::to_string)
            .ok_or_else(|| {
                RunError::config(
                    "TOTAL_PODS",
                    format!("successor {} beyond {} resolved peers", position.successor(), peers.len()),
                )
            })?,
    };

    Ok(Plan {
        identity,
        position,
        target,
    })
}

/// Per-member DNS name: `<base>-<index>.<subdomain>`.
fn member_name(base: &str, index: usize, subdomain: &str) -> String {
    format!("{base}-{index}.{subdomain}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, RunMode};
    use crate::events::{Bus, EventKind};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct Fixed(Vec<&'static str>);

    #[async_trait]
    impl Resolve for Fixed {
        async fn lookup(&self, _group: &str) -> std::io::Result<Vec<String>> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    fn ctx(f: impl FnOnce(&mut Config)) -> RunContext {
        let mut config = Config {
            mode: RunMode::Peer,
            subdomain: Some("ring".into()),
            retry_max: 2,
            retry_backoff: Duration::from_millis(1),
            retry_backoff_cap: Duration::from_millis(1),
            peer_warmup: Duration::from_secs(2),
            ..Config::default()
        };
        f(&mut config);
        RunContext::new(config, Bus::new(64), CancellationToken::new())
    }

    #[test]
    fn hostname_base() {
        assert_eq!(host_base("peer-job-1").as_deref(), Some("peer-job"));
        assert_eq!(host_base("peer-job-12").as_deref(), Some("peer-job"));
        assert_eq!(host_base("standalone"), None);
        assert_eq!(host_base("-3"), None);
    }

    #[tokio::test]
    async fn plans_member_names_without_resolution() {
        let ctx = ctx(|c| {
            c.job_index = Some(2);
            c.total_peers = 3;
            c.hostname = Some("peer-job-2".into());
        });
        let plan = plan(&ctx, Arc::new(Fixed(Vec::new())), "ring").await.unwrap();
        assert_eq!(plan.target, "peer-job-0.ring");
        assert_eq!(plan.identity, "2");
    }

    #[tokio::test]
    async fn infers_total_from_resolution() {
        let ctx = ctx(|c| {
            c.job_index = Some(1);
            c.hostname = Some("peer-job-1".into());
        });
        let peers = Fixed(vec!["10.0.0.3", "10.0.0.1", "10.0.0.2"]);
        let plan = plan(&ctx, Arc::new(peers), "ring").await.unwrap();
        assert_eq!(plan.position, RingPosition::new(1, 3).unwrap());
        assert_eq!(plan.target, "peer-job-2.ring");
    }

    #[tokio::test]
    async fn locates_self_by_address() {
        let ctx = ctx(|c| {
            c.self_address = Some("10.0.0.3".into());
        });
        let peers = Fixed(vec!["10.0.0.3", "10.0.0.1", "10.0.0.2"]);
        let plan = plan(&ctx, Arc::new(peers), "ring").await.unwrap();
        assert_eq!(plan.identity, "10.0.0.3");
        assert_eq!(plan.target, "10.0.0.1");
    }

    #[tokio::test]
    async fn absent_self_address_fails() {
        let ctx = ctx(|c| {
            c.self_address = Some("10.9.9.9".into());
        });
        let peers = Fixed(vec!["10.0.0.1", "10.0.0.2"]);
        let err = plan(&ctx, Arc::new(peers), "ring").await.unwrap_err();
        assert_eq!(err.as_label(), "peer_self_not_found");
    }

    #[tokio::test]
    async fn ring_of_one_handshakes_itself() {
        let port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let ctx = ctx(|c| {
            c.http_port = port;
            c.job_index = Some(0);
            c.total_peers = 1;
            c.min_peers = 1;
        });
        let mut rx = ctx.bus.subscribe();

        run_with(&ctx, Arc::new(Fixed(vec!["127.0.0.1"]))).await.unwrap();

        let kinds: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok()).map(|e| e.kind).collect();
        assert!(kinds.contains(&EventKind::PeersResolved));
        assert!(kinds.contains(&EventKind::HandshakeAccepted));
    }
}
