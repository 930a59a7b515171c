//! Deterministic in-memory host.
//!
//! [`SimHost`] implements [`HostBridge`] over plain maps: an entity table
//! with poses and health, a roster of "real" players, a settable TPS sample,
//! and append-only logs of commands, broadcasts, notices, and removals. The
//! engine test suites drive it instead of a live server; every mutation is
//! observable through the accessor methods.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use specter_core::action::ActionKind;
use specter_core::ids::SessionId;
use specter_core::location::Location;

use crate::bridge::{BridgeError, CommandActor, HostBridge, SpawnProfile};
use crate::transport::SessionTransport;

/// One simulated entity as the sim host sees it.
#[derive(Clone, Debug)]
pub struct SimEntity {
    /// Display name at spawn time.
    pub name: String,
    /// Current pose.
    pub pos: Location,
    /// Current health.
    pub health: f64,
    /// Max-health attribute.
    pub max_health: f64,
    /// Ticks run for this entity.
    pub ticks: u64,
    /// Actions performed, in order.
    pub actions: Vec<ActionKind>,
    /// How many times queued motion was discarded.
    pub motion_cancelled: u64,
}

#[derive(Default)]
struct SimState {
    entities: HashMap<SessionId, SimEntity>,
    online: HashSet<String>,
    tps: f64,
    commands: Vec<(CommandActor, String)>,
    broadcasts: Vec<String>,
    notices: Vec<(String, String)>,
    removed: Vec<(SessionId, String)>,
    forced_regions: Vec<(String, i32, i32)>,
    health_writes: Vec<(SessionId, f64)>,
    action_log: Vec<(SessionId, ActionKind)>,
    spawn_drift: Option<(f64, f64, f64)>,
    fail_next_spawn: Option<String>,
    accept_commands: bool,
}

/// In-memory [`HostBridge`] implementation for tests.
pub struct SimHost {
    state: Mutex<SimState>,
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHost {
    /// A healthy empty host: 20.0 TPS, nobody online, commands accepted.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                tps: 20.0,
                accept_commands: true,
                ..SimState::default()
            }),
        }
    }

    /// Mark a real player as connected to this node.
    pub fn connect(&self, name: impl Into<String>) {
        let _ = self.state.lock().online.insert(name.into());
    }

    /// Mark a real player as disconnected.
    pub fn disconnect(&self, name: &str) {
        let _ = self.state.lock().online.remove(name);
    }

    /// Override the rolling TPS sample returned by `health_sample`.
    pub fn set_tps(&self, tps: f64) {
        self.state.lock().tps = tps;
    }

    /// Make the next `spawn_entity` call fail with this reason.
    pub fn fail_next_spawn(&self, reason: impl Into<String>) {
        self.state.lock().fail_next_spawn = Some(reason.into());
    }

    /// Accept (`true`, default) or reject (`false`) dispatched commands.
    pub fn accept_commands(&self, accept: bool) {
        self.state.lock().accept_commands = accept;
    }

    /// Displace every subsequent spawn by this delta, simulating the pose
    /// nudge a real host applies while wiring an entity into the world.
    pub fn set_spawn_drift(&self, dx: f64, dy: f64, dz: f64) {
        self.state.lock().spawn_drift = Some((dx, dy, dz));
    }

    /// Snapshot of one entity, if it exists.
    #[must_use]
    pub fn entity(&self, id: SessionId) -> Option<SimEntity> {
        self.state.lock().entities.get(&id).cloned()
    }

    /// Whether the entity exists in the world.
    #[must_use]
    pub fn has_entity(&self, id: SessionId) -> bool {
        self.state.lock().entities.contains_key(&id)
    }

    /// Number of entities currently in the world.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.state.lock().entities.len()
    }

    /// Every command dispatched so far, in order.
    #[must_use]
    pub fn commands(&self) -> Vec<(CommandActor, String)> {
        self.state.lock().commands.clone()
    }

    /// Every broadcast sent so far, in order.
    #[must_use]
    pub fn broadcasts(&self) -> Vec<String> {
        self.state.lock().broadcasts.clone()
    }

    /// Every (recipient, message) notice sent so far, in order.
    #[must_use]
    pub fn notices(&self) -> Vec<(String, String)> {
        self.state.lock().notices.clone()
    }

    /// Every (id, reason) removal so far, in order.
    #[must_use]
    pub fn removed(&self) -> Vec<(SessionId, String)> {
        self.state.lock().removed.clone()
    }

    /// Regions pinned by `force_load_region`, in order.
    #[must_use]
    pub fn forced_regions(&self) -> Vec<(String, i32, i32)> {
        self.state.lock().forced_regions.clone()
    }

    /// Every `set_health` write so far, in order, removed entities included.
    #[must_use]
    pub fn health_writes(&self) -> Vec<(SessionId, f64)> {
        self.state.lock().health_writes.clone()
    }

    /// Every performed action so far, in order, surviving entity removal.
    #[must_use]
    pub fn action_log(&self) -> Vec<(SessionId, ActionKind)> {
        self.state.lock().action_log.clone()
    }
}

impl HostBridge for SimHost {
    fn name(&self) -> &'static str {
        "sim"
    }

    fn supports(&self, _host_version: &str) -> bool {
        true
    }

    fn force_load_region(&self, at: &Location) {
        let (rx, rz) = at.region();
        self.state
            .lock()
            .forced_regions
            .push((at.world.clone(), rx, rz));
    }

    fn spawn_entity(&self, profile: &SpawnProfile) -> Result<(), BridgeError> {
        let mut state = self.state.lock();
        if let Some(reason) = state.fail_next_spawn.take() {
            return Err(BridgeError::SpawnRejected(reason));
        }
        let mut pos = profile.at.clone();
        if let Some((dx, dy, dz)) = state.spawn_drift {
            pos.x += dx;
            pos.y += dy;
            pos.z += dz;
        }
        let _ = state.entities.insert(
            profile.id,
            SimEntity {
                name: profile.name.clone(),
                pos,
                health: 20.0,
                max_health: 20.0,
                ticks: 0,
                actions: Vec::new(),
                motion_cancelled: 0,
            },
        );
        Ok(())
    }

    fn remove_entity(&self, id: SessionId, reason: &str) {
        let mut state = self.state.lock();
        if state.entities.remove(&id).is_some() {
            state.removed.push((id, reason.to_owned()));
        }
    }

    fn tick_entity(&self, id: SessionId) {
        if let Some(entity) = self.state.lock().entities.get_mut(&id) {
            entity.ticks += 1;
        }
    }

    fn cancel_pending_motion(&self, id: SessionId) {
        if let Some(entity) = self.state.lock().entities.get_mut(&id) {
            entity.motion_cancelled += 1;
        }
    }

    fn teleport(&self, id: SessionId, to: &Location) {
        if let Some(entity) = self.state.lock().entities.get_mut(&id) {
            entity.pos = to.clone();
        }
    }

    fn perform_action(&self, id: SessionId, action: ActionKind) {
        let mut state = self.state.lock();
        let Some(entity) = state.entities.get_mut(&id) else {
            return;
        };
        entity.actions.push(action);
        state.action_log.push((id, action));
    }

    fn max_health(&self, id: SessionId) -> Option<f64> {
        self.state.lock().entities.get(&id).map(|e| e.max_health)
    }

    fn set_health(&self, id: SessionId, health: f64) {
        let mut state = self.state.lock();
        state.health_writes.push((id, health));
        if let Some(entity) = state.entities.get_mut(&id) {
            entity.health = health;
        }
    }

    fn execute_as(&self, actor: CommandActor, command: &str) -> bool {
        let mut state = self.state.lock();
        if !state.accept_commands {
            return false;
        }
        state.commands.push((actor, command.to_owned()));
        true
    }

    fn health_sample(&self) -> f64 {
        self.state.lock().tps
    }

    fn online_players(&self) -> Vec<String> {
        self.state.lock().online.iter().cloned().collect()
    }

    fn is_online(&self, name: &str) -> bool {
        self.state.lock().online.contains(name)
    }

    fn broadcast(&self, message: &str) {
        self.state.lock().broadcasts.push(message.to_owned());
    }

    fn notify(&self, recipient: &str, message: &str) {
        self.state
            .lock()
            .notices
            .push((recipient.to_owned(), message.to_owned()));
    }
}

/// Transport that keeps everything it is asked to send.
///
/// Engine tests swap this in for [`crate::transport::NullTransport`] to
/// assert on kick text delivery.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    inner: Mutex<RecordingState>,
}

#[derive(Debug, Default)]
struct RecordingState {
    sent: Vec<String>,
    closed: bool,
}

impl RecordingTransport {
    /// A fresh, open transport with an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Text delivered so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.inner.lock().sent.clone()
    }
}

impl SessionTransport for RecordingTransport {
    fn send_text(&self, text: &str) {
        self.inner.lock().sent.push(text.to_owned());
    }

    fn close(&self) {
        self.inner.lock().closed = true;
    }

    fn is_open(&self) -> bool {
        !self.inner.lock().closed
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: SessionId, name: &str) -> SpawnProfile {
        SpawnProfile {
            id,
            name: name.to_owned(),
            at: Location::new("world", 8.0, 64.0, 8.0),
            invulnerable: true,
            collidable: true,
            pickup_items: true,
            skin_source: None,
        }
    }

    #[test]
    fn spawn_then_remove_logs_reason() {
        let host = SimHost::new();
        let id = SessionId::new();
        host.spawn_entity(&profile(id, "ghost_1")).expect("spawn");
        assert!(host.has_entity(id));

        host.remove_entity(id, "lifespan ends");
        assert!(!host.has_entity(id));
        assert_eq!(host.removed(), vec![(id, "lifespan ends".to_owned())]);
    }

    #[test]
    fn remove_unknown_entity_is_silent() {
        let host = SimHost::new();
        host.remove_entity(SessionId::new(), "whatever");
        assert!(host.removed().is_empty());
    }

    #[test]
    fn fail_next_spawn_fires_once() {
        let host = SimHost::new();
        let id = SessionId::new();
        host.fail_next_spawn("world not ready");
        let err = host.spawn_entity(&profile(id, "ghost_1")).expect_err("fails");
        assert!(err.to_string().contains("world not ready"));

        host.spawn_entity(&profile(id, "ghost_1")).expect("second try spawns");
    }

    #[test]
    fn spawn_drift_displaces_pose() {
        let host = SimHost::new();
        let id = SessionId::new();
        host.set_spawn_drift(0.5, 0.0, -0.25);
        host.spawn_entity(&profile(id, "ghost_1")).expect("spawn");

        let entity = host.entity(id).expect("exists");
        assert_eq!(entity.pos.x, 8.5);
        assert_eq!(entity.pos.z, 7.75);
    }

    #[test]
    fn ticks_and_actions_accumulate() {
        let host = SimHost::new();
        let id = SessionId::new();
        host.spawn_entity(&profile(id, "ghost_1")).expect("spawn");

        host.tick_entity(id);
        host.tick_entity(id);
        host.perform_action(id, ActionKind::Jump);

        let entity = host.entity(id).expect("exists");
        assert_eq!(entity.ticks, 2);
        assert_eq!(entity.actions, vec![ActionKind::Jump]);

        // The global log keeps the entry even after the entity goes away.
        host.remove_entity(id, "done");
        assert_eq!(host.action_log(), vec![(id, ActionKind::Jump)]);
        host.perform_action(id, ActionKind::Jump);
        assert_eq!(host.action_log().len(), 1);
    }

    #[test]
    fn rejected_commands_are_not_logged() {
        let host = SimHost::new();
        host.accept_commands(false);
        assert!(!host.execute_as(CommandActor::Console, "say hi"));
        assert!(host.commands().is_empty());
    }

    #[test]
    fn roster_tracks_connects_and_disconnects() {
        let host = SimHost::new();
        host.connect("alice");
        assert!(host.is_online("alice"));
        assert!(!host.is_online("Alice"));

        host.disconnect("alice");
        assert!(!host.is_online("alice"));
    }

    #[test]
    fn recording_transport_keeps_order() {
        let transport = RecordingTransport::new();
        transport.send_text("first");
        transport.send_text("second");
        transport.close();

        assert_eq!(transport.sent(), vec!["first".to_owned(), "second".to_owned()]);
        assert!(!transport.is_open());
    }
}
