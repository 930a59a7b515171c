//! Action scheduling on a session.
//!
//! A session holds at most one scheduled action. `Once` fires on the next
//! simulation step and clears itself; `Continuous` fires every step until
//! replaced or stopped. Scheduling against a missing entity is harmless:
//! the bridge treats unknown ids as no-ops.

use std::fmt;

use specter_core::action::ActionKind;
use specter_host::bridge::HostBridge;

use crate::session::Session;

/// Cadence for a scheduled action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionSetting {
    /// Clear the current schedule.
    Stop,
    /// Fire on the next step, then clear.
    Once,
    /// Fire every step until replaced or stopped.
    Continuous,
}

impl fmt::Display for ActionSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionSetting::Stop => "stop",
            ActionSetting::Once => "once",
            ActionSetting::Continuous => "continuous",
        };
        f.write_str(label)
    }
}

/// An action bound to a cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduledAction {
    /// What to perform.
    pub kind: ActionKind,
    /// How often to perform it.
    pub setting: ActionSetting,
}

impl Session {
    /// Schedule `kind` at `setting`, replacing whatever was scheduled.
    ///
    /// `Stop` clears the slot regardless of `kind`.
    pub fn set_action(&self, kind: ActionKind, setting: ActionSetting) {
        let mut slot = self.action.lock();
        *slot = match setting {
            ActionSetting::Stop => None,
            ActionSetting::Once | ActionSetting::Continuous => {
                Some(ScheduledAction { kind, setting })
            }
        };
    }

    /// Clear any scheduled action.
    pub fn clear_action(&self) {
        *self.action.lock() = None;
    }

    /// Currently scheduled action, if any.
    #[must_use]
    pub fn scheduled_action(&self) -> Option<ScheduledAction> {
        *self.action.lock()
    }

    /// Perform this step's scheduled action, if one is set.
    pub(crate) fn run_scheduled_action(&self, bridge: &dyn HostBridge) {
        let Some(scheduled) = self.scheduled_action() else {
            return;
        };
        bridge.perform_action(self.id, scheduled.kind);
        if scheduled.setting == ActionSetting::Once {
            // Clear only if unchanged; a schedule replaced mid-step wins.
            let mut slot = self.action.lock();
            if *slot == Some(scheduled) {
                *slot = None;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    use specter_core::actor::Creator;
    use specter_core::ids::SessionId;
    use specter_core::location::Location;
    use specter_host::bridge::SpawnProfile;
    use specter_host::sim::SimHost;
    use specter_host::transport::NullTransport;
    use specter_store::prefs::SessionPrefs;
    use uuid::Uuid;

    use crate::naming::SequenceName;

    fn spawned_session(host: &SimHost) -> Arc<Session> {
        let session = Session::new(
            SessionId::new(),
            SequenceName {
                name: "ghost_1".into(),
                creator: "alice".into(),
                ordinal: Some(1),
            },
            Creator::player("alice", Uuid::new_v4(), IpAddr::V4(Ipv4Addr::LOCALHOST)),
            Location::new("world", 0.0, 64.0, 0.0),
            SessionPrefs::default(),
            None,
            Arc::new(NullTransport::new()),
        );
        host.spawn_entity(&SpawnProfile {
            id: session.id,
            name: session.name_str().to_owned(),
            at: session.spawn_at.clone(),
            invulnerable: true,
            collidable: true,
            pickup_items: true,
            skin_source: None,
        })
        .expect("spawn");
        session
    }

    #[test]
    fn once_fires_a_single_time_then_clears() {
        let host = SimHost::new();
        let session = spawned_session(&host);

        session.set_action(ActionKind::Jump, ActionSetting::Once);
        session.run_scheduled_action(&host);
        session.run_scheduled_action(&host);

        let entity = host.entity(session.id).expect("exists");
        assert_eq!(entity.actions, vec![ActionKind::Jump]);
        assert_eq!(session.scheduled_action(), None);
    }

    #[test]
    fn continuous_fires_every_step_until_stopped() {
        let host = SimHost::new();
        let session = spawned_session(&host);

        session.set_action(ActionKind::Attack, ActionSetting::Continuous);
        session.run_scheduled_action(&host);
        session.run_scheduled_action(&host);
        session.set_action(ActionKind::Attack, ActionSetting::Stop);
        session.run_scheduled_action(&host);

        let entity = host.entity(session.id).expect("exists");
        assert_eq!(entity.actions, vec![ActionKind::Attack, ActionKind::Attack]);
    }

    #[test]
    fn scheduling_replaces_the_previous_action() {
        let host = SimHost::new();
        let session = spawned_session(&host);

        session.set_action(ActionKind::Mine, ActionSetting::Continuous);
        session.set_action(ActionKind::Sneak, ActionSetting::Continuous);
        session.run_scheduled_action(&host);

        let entity = host.entity(session.id).expect("exists");
        assert_eq!(entity.actions, vec![ActionKind::Sneak]);
    }

    #[test]
    fn missing_entity_is_a_quiet_no_op() {
        let host = SimHost::new();
        let session = spawned_session(&host);
        host.remove_entity(session.id, "gone");

        session.set_action(ActionKind::UseItem, ActionSetting::Once);
        session.run_scheduled_action(&host);
        assert_eq!(host.entity_count(), 0);
    }
}
