//! Network-wide presence lookup.
//!
//! On a multi-node network a creator can be connected to a different node
//! than the one simulating their sessions, so the local player list alone
//! cannot tell "offline" from "elsewhere". A [`MessageRelay`] answers
//! with the roster across all nodes; [`LocalRelay`] is the single-node
//! implementation backed by the host's own player list.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use specter_host::bridge::HostBridge;

/// Roster lookup failed.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The relay backend is not reachable.
    #[error("relay unavailable: {0}")]
    Unavailable(String),

    /// No reply arrived in time.
    #[error("relay timed out")]
    Timeout,
}

/// Set of player names online anywhere on the network.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RosterSnapshot {
    names: HashSet<String>,
}

impl RosterSnapshot {
    /// Snapshot over the given names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `name` is online somewhere.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether nobody is online.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Answers the network-wide online roster.
#[async_trait]
pub trait MessageRelay: Send + Sync {
    /// Current roster across every node.
    async fn query_roster(&self) -> Result<RosterSnapshot, RelayError>;
}

/// Single-node relay backed by the local host's player list.
pub struct LocalRelay {
    bridge: Arc<dyn HostBridge>,
}

impl LocalRelay {
    /// A relay that reports exactly the local node's players.
    #[must_use]
    pub fn new(bridge: Arc<dyn HostBridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl MessageRelay for LocalRelay {
    async fn query_roster(&self) -> Result<RosterSnapshot, RelayError> {
        Ok(RosterSnapshot::from_names(self.bridge.online_players()))
    }
}

/// Parse a delimited roster payload, tolerating spaces after commas and
/// stray separators in partial replies.
#[must_use]
pub fn parse_roster(payload: &str) -> RosterSnapshot {
    RosterSnapshot::from_names(
        payload
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty()),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
