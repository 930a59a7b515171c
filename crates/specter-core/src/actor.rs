//! Creator identities for session ownership and admission control.
//!
//! Every session belongs to exactly one [`Creator`]: either a connected
//! player (carrying the account UUID and the network origin used for
//! origin-based caps) or the server console. The console is the elevated
//! actor: it bypasses quotas and is never considered offline by presence
//! reconciliation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use uuid::Uuid;

/// Display name reserved for the server console actor.
pub const CONSOLE_NAME: &str = "CONSOLE";

/// What kind of actor created a session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CreatorKind {
    /// A connected player, identified by account UUID and network origin.
    #[serde(rename_all = "camelCase")]
    Player {
        /// Account identifier of the creating player.
        id: Uuid,
        /// Network origin the player connected from.
        origin: IpAddr,
    },
    /// The server console.
    Console,
}

/// The actor a session belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    /// Display name, unique among connected actors at any instant.
    pub name: String,
    /// Player or console.
    pub kind: CreatorKind,
    /// Operators bypass admission caps. Console is always privileged.
    pub privileged: bool,
}

impl Creator {
    /// An ordinary connected player.
    #[must_use]
    pub fn player(name: impl Into<String>, id: Uuid, origin: IpAddr) -> Self {
        Self {
            name: name.into(),
            kind: CreatorKind::Player { id, origin },
            privileged: false,
        }
    }

    /// The server console actor.
    #[must_use]
    pub fn console() -> Self {
        Self {
            name: CONSOLE_NAME.to_owned(),
            kind: CreatorKind::Console,
            privileged: true,
        }
    }

    /// Mark this creator as an operator (cap bypass).
    #[must_use]
    pub fn with_privilege(mut self) -> Self {
        self.privileged = true;
        self
    }

    /// Whether this creator is the server console.
    #[must_use]
    pub fn is_console(&self) -> bool {
        matches!(self.kind, CreatorKind::Console)
    }

    /// Whether admission caps apply to this creator.
    #[must_use]
    pub fn is_privileged(&self) -> bool {
        self.privileged || self.is_console()
    }

    /// Network origin, if this creator is a connected player.
    #[must_use]
    pub fn origin(&self) -> Option<IpAddr> {
        match self.kind {
            CreatorKind::Player { origin, .. } => Some(origin),
            CreatorKind::Console => None,
        }
    }

    /// Account UUID, if this creator is a connected player.
    #[must_use]
    pub fn player_id(&self) -> Option<Uuid> {
        match self.kind {
            CreatorKind::Player { id, .. } => Some(id),
            CreatorKind::Console => None,
        }
    }
}

impl fmt::Display for Creator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
