//! # Peer ring: membership, ordering and the successor handshake.
//!
//! - [`PeerRingResolver`] waits for a group to warm up and returns a [`PeerSet`]
//! - [`PeerSet`] / [`RingPosition`] canonical ring and successor arithmetic
//! - [`HandshakeClient`] notifies the successor over HTTP
//! - [`LivenessEndpoint`] the receiving side of a handshake

mod endpoint;
mod handshake;
mod resolver;
mod ring;

pub use endpoint::LivenessEndpoint;
pub use handshake::{HANDSHAKE_TIMEOUT, Handshake, HandshakeClient};
pub use resolver::{DEFAULT_POLL, DnsResolver, PeerRingResolver, Resolve};
pub use ring::{PeerSet, RingPosition};
