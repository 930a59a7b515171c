//! Engine error taxonomy.
//!
//! Known failure kinds carry enough context to show the requesting user a
//! meaningful message. Everything else funnels into
//! [`SpawnPipelineError::Internal`], which is logged with full context and
//! surfaced as a generic failure; nothing here ever panics the simulation
//! thread.

use std::fmt;

use thiserror::Error;

use specter_host::bridge::BridgeError;

/// Which cap rejected an admission attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapacityScope {
    /// The whole-server session cap.
    Server,
    /// The per-creator session cap.
    Creator,
    /// The shared-network-origin cap.
    Origin,
}

impl fmt::Display for CapacityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Server => "server",
            Self::Creator => "creator",
            Self::Origin => "origin",
        };
        f.write_str(name)
    }
}

/// Admission refused a spawn request.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{scope} session cap reached ({limit})")]
pub struct CapacityError {
    /// The cap that fired.
    pub scope: CapacityScope,
    /// The configured limit that was hit.
    pub limit: u32,
}

/// A requested custom display name is unusable.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InvalidNameError {
    /// Empty or whitespace-only.
    #[error("name is blank")]
    Blank,

    /// Longer than the host display-name cap.
    #[error("name exceeds {limit} characters")]
    TooLong {
        /// The configured character cap.
        limit: usize,
    },

    /// Another live session already holds the name.
    #[error("name {name:?} is already in use")]
    Taken {
        /// The colliding name.
        name: String,
    },
}

/// The host refused to create the entity.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("spawn failed: {reason}")]
pub struct SpawnError {
    /// Host-provided rejection text.
    pub reason: String,
}

impl From<BridgeError> for SpawnError {
    fn from(err: BridgeError) -> Self {
        Self {
            reason: err.to_string(),
        }
    }
}

/// A scripted command hook line failed. Logged and skipped; never aborts
/// the surrounding dispatch sequence.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("scripted command {command:?} failed: {reason}")]
pub struct ScriptedCommandError {
    /// The line after normalization and placeholder substitution.
    pub command: String,
    /// Why the host rejected it.
    pub reason: String,
}

/// Funnel for everything the spawn pipeline can produce.
#[derive(Debug, Error)]
pub enum SpawnPipelineError {
    /// An admission cap fired.
    #[error(transparent)]
    Capacity(#[from] CapacityError),

    /// The requested name is unusable.
    #[error(transparent)]
    Name(#[from] InvalidNameError),

    /// The host rejected entity creation.
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    /// Anything unexpected. Shown to users as a generic failure.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SpawnPipelineError {
    /// Text safe to show the requesting user, `None` for unknown kinds.
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Capacity(e) => Some(e.to_string()),
            Self::Name(e) => Some(e.to_string()),
            Self::Spawn(e) => Some(e.to_string()),
            Self::Internal(_) => None,
        }
    }

    /// Stable category string for logs and metrics.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Capacity(_) => "capacity",
            Self::Name(_) => "invalid_name",
            Self::Spawn(_) => "spawn",
            Self::Internal(_) => "internal",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
