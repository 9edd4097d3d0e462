//! # Canonical ring over a resolved peer group.
//!
//! Every cohort member resolves the same group independently. Sorting the
//! deduplicated addresses into one total order lets each member compute the
//! identical ring, and the same successor for a given index, without talking
//! to anyone.

use std::fmt;

use crate::error::RunError;

/// Deduplicated, lexicographically sorted peer addresses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerSet {
    addrs: Vec<String>,
}

impl PeerSet {
    /// Builds the canonical set from addresses in any order.
    ///
    /// ```
    /// use jobvisor::PeerSet;
    ///
    /// let set = PeerSet::from_addresses(["10.0.0.3", "10.0.0.1", "10.0.0.2", "10.0.0.1"]);
    /// assert_eq!(set.as_slice(), ["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
    /// ```
    pub fn from_addresses<I, S>(addrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut addrs: Vec<String> = addrs
            .into_iter()
            .map(Into::into)
            .filter(|a| !a.is_empty())
            .collect();
        addrs.sort_unstable();
        addrs.dedup();
        Self { addrs }
    }

    /// Number of distinct peers.
    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    /// Whether no peer was resolved.
    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    /// Addresses in ring order.
    pub fn as_slice(&self) -> &[String] {
        &self.addrs
    }

    /// Address at ring index `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.addrs.get(index).map(String::as_str)
    }

    /// Ring index of `identity` (linear scan).
    ///
    /// Fails with [`RunError::SelfNotFound`] if it is absent.
    pub fn position_of(&self, identity: &str) -> Result<usize, RunError> {
        self.addrs
            .iter()
            .position(|a| a == identity)
            .ok_or_else(|| RunError::SelfNotFound {
                identity: identity.to_string(),
                total: self.addrs.len(),
            })
    }
}

/// A member's place in a ring of `total` members.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RingPosition {
    index: usize,
    total: usize,
}

impl RingPosition {
    /// Creates a position; `index` must be below `total`.
    pub fn new(index: usize, total: usize) -> Result<Self, RunError> {
        if total == 0 {
            return Err(RunError::config("TOTAL_PODS", "ring must have at least one member"));
        }
        if index >= total {
            return Err(RunError::config(
                "JOB_INDEX",
                format!("index {index} outside ring of {total}"),
            ));
        }
        Ok(Self { index, total })
    }

    /// This member's index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Ring size.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Index of the next member; a ring of one is its own successor.
    pub fn successor(&self) -> usize {
        (self.index + 1) % self.total
    }
}

impl fmt::Display for RingPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} -> {}", self.index, self.total, self.successor())
    }
}
