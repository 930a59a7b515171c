//! Versioned host bridge.
//!
//! Everything the engine needs from the game server funnels through
//! [`HostBridge`]: entity creation and removal, per-tick simulation, pose
//! control, attribute access, command dispatch, presence, and health
//! sampling. Implementations are written per host version and one is picked
//! at startup by [`select_bridge`]; the engine never touches host internals
//! directly.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use specter_core::action::ActionKind;
use specter_core::ids::SessionId;
use specter_core::location::Location;

/// Failure surfaced by a bridge operation.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The host refused to create the entity.
    #[error("host rejected entity creation: {0}")]
    SpawnRejected(String),

    /// No registered bridge supports the running host version.
    #[error("no bridge supports host version {host_version}")]
    Unsupported {
        /// Version string reported by the host.
        host_version: String,
    },
}

/// The identity a scripted command line runs under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandActor {
    /// The server console.
    Console,
    /// A live simulated session.
    Session(SessionId),
}

/// Everything the host needs to create one simulated entity.
#[derive(Clone, Debug)]
pub struct SpawnProfile {
    /// Identity the entity will carry.
    pub id: SessionId,
    /// Display name, already validated and reserved.
    pub name: String,
    /// Pose to place the entity at.
    pub at: Location,
    /// Entity ignores damage.
    pub invulnerable: bool,
    /// Entity has a collision box.
    pub collidable: bool,
    /// Entity picks up nearby item drops.
    pub pickup_items: bool,
    /// Copy the skin of this account, when set.
    pub skin_source: Option<Uuid>,
}

/// Capabilities the engine requires from the host game server.
///
/// Entity mutation methods are only called from the host's simulation
/// thread. `health_sample`, `online_players`, `is_online`, `broadcast`, and
/// `notify` may also be called from background tasks and must be safe to
/// invoke from any thread.
pub trait HostBridge: Send + Sync {
    /// Implementation name, for startup logs.
    fn name(&self) -> &'static str;

    /// Whether this implementation supports the given host version string.
    fn supports(&self, host_version: &str) -> bool;

    /// Ensure the region containing `at` is loaded and stays loaded.
    fn force_load_region(&self, at: &Location);

    /// Create the entity and wire it into the host's player list.
    fn spawn_entity(&self, profile: &SpawnProfile) -> Result<(), BridgeError>;

    /// Remove the entity from the world, surfacing `reason` as kick text.
    /// Must be a no-op for an entity the host no longer knows.
    fn remove_entity(&self, id: SessionId, reason: &str);

    /// Run one simulation tick for the entity.
    fn tick_entity(&self, id: SessionId);

    /// Discard any motion or position delta the host queued for the entity.
    fn cancel_pending_motion(&self, id: SessionId);

    /// Move the entity to an exact pose.
    fn teleport(&self, id: SessionId, to: &Location);

    /// Perform one scripted action for the entity. A vanished entity is a
    /// no-op, never an error.
    fn perform_action(&self, id: SessionId, action: ActionKind);

    /// Max-health attribute of the entity, if it still exists.
    fn max_health(&self, id: SessionId) -> Option<f64>;

    /// Overwrite the entity's current health.
    fn set_health(&self, id: SessionId, health: f64);

    /// Execute a command line as the given actor. Returns `true` when the
    /// host dispatcher accepted it.
    fn execute_as(&self, actor: CommandActor, command: &str) -> bool;

    /// Rolling ticks-per-second sample for the node.
    fn health_sample(&self) -> f64;

    /// Names of real players currently connected to this node.
    fn online_players(&self) -> Vec<String>;

    /// Whether a real player with exactly this name is connected here.
    fn is_online(&self, name: &str) -> bool;

    /// Send a message to every connected player.
    fn broadcast(&self, message: &str);

    /// Send a message to one connected actor by name.
    fn notify(&self, recipient: &str, message: &str);
}

// On the trait object, not a supertrait: implementors need not be `Debug`.
impl fmt::Debug for dyn HostBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBridge")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

/// Pick the first bridge that supports `host_version`.
///
/// Candidates are tried in registration order, so list the most specific
/// implementations first. Startup fails when none match; there is no
/// reflective fallback.
pub fn select_bridge(
    candidates: Vec<Arc<dyn HostBridge>>,
    host_version: &str,
) -> Result<Arc<dyn HostBridge>, BridgeError> {
    for bridge in candidates {
        if bridge.supports(host_version) {
            info!(bridge = bridge.name(), host_version, "selected host bridge");
            return Ok(bridge);
        }
    }
    Err(BridgeError::Unsupported {
        host_version: host_version.to_owned(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
