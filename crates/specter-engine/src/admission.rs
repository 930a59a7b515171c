//! Admission control over session creation.
//!
//! Caps count live sessions plus spawns still in flight, so parallel
//! requests cannot slip past a limit together. Each admitted request
//! holds a [`PendingGuard`]; the pending slot frees when the guard drops,
//! whether the spawn registered a session or failed.
//!
//! Callers register the finished session in the directory before dropping
//! the guard. In that window the session counts twice, which errs toward
//! rejection; a cap is never exceeded.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use specter_core::actor::Creator;
use specter_settings::types::LimitSettings;

use crate::directory::SessionDirectory;
use crate::errors::{CapacityError, CapacityScope};

#[derive(Debug, Default)]
struct PendingCounts {
    total: u32,
    per_creator: HashMap<String, u32>,
}

/// A held pending-spawn slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct PendingGuard {
    counts: Arc<Mutex<PendingCounts>>,
    creator: String,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let mut counts = self.counts.lock();
        counts.total = counts.total.saturating_sub(1);
        let emptied = match counts.per_creator.get_mut(&self.creator) {
            Some(held) => {
                *held = held.saturating_sub(1);
                *held == 0
            }
            None => false,
        };
        if emptied {
            let _ = counts.per_creator.remove(&self.creator);
        }
    }
}

/// Gatekeeper for new sessions.
pub struct AdmissionController {
    limits: LimitSettings,
    directory: Arc<SessionDirectory>,
    pending: Arc<Mutex<PendingCounts>>,
}

impl AdmissionController {
    /// A controller enforcing `limits` against `directory`.
    #[must_use]
    pub fn new(limits: LimitSettings, directory: Arc<SessionDirectory>) -> Self {
        Self {
            limits,
            directory,
            pending: Arc::new(Mutex::new(PendingCounts::default())),
        }
    }

    /// Admit one spawn request, reserving a pending slot on success.
    ///
    /// Checks run in order: server cap, per-creator cap, then the
    /// shared-origin cap when origin detection is on. Privileged creators
    /// and the console skip every check, but their sessions still occupy
    /// slots that count against everyone else.
    pub fn admit(&self, creator: &Creator) -> Result<PendingGuard, CapacityError> {
        let mut counts = self.pending.lock();

        if !creator.is_privileged() {
            let live = self.directory.count() as u32;
            if live.saturating_add(counts.total) >= self.limits.server_max {
                return Err(CapacityError {
                    scope: CapacityScope::Server,
                    limit: self.limits.server_max,
                });
            }

            let live_creator = self.directory.count_by_creator(&creator.name) as u32;
            let pending_creator = counts.per_creator.get(&creator.name).copied().unwrap_or(0);
            if live_creator.saturating_add(pending_creator) >= self.limits.creator_max {
                return Err(CapacityError {
                    scope: CapacityScope::Creator,
                    limit: self.limits.creator_max,
                });
            }

            // The origin cap sees live sessions only; a pending spawn has
            // no directory entry to index by address yet.
            if self.limits.detect_origin {
                if let Some(origin) = creator.origin() {
                    if self.directory.count_by_origin(origin) as u32 >= self.limits.creator_max {
                        return Err(CapacityError {
                            scope: CapacityScope::Origin,
                            limit: self.limits.creator_max,
                        });
                    }
                }
            }
        }

        counts.total = counts.total.saturating_add(1);
        *counts.per_creator.entry(creator.name.clone()).or_insert(0) += 1;
        Ok(PendingGuard {
            counts: Arc::clone(&self.pending),
            creator: creator.name.clone(),
        })
    }

    /// Spawns admitted but not yet registered or failed.
    #[must_use]
    pub fn pending_total(&self) -> u32 {
        self.pending.lock().total
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    use specter_core::ids::SessionId;
    use specter_core::location::Location;
    use specter_host::transport::NullTransport;
    use specter_store::prefs::SessionPrefs;
    use uuid::Uuid;

    use crate::naming::SequenceName;
    use crate::session::Session;

    fn limits(server_max: u32, creator_max: u32, detect_origin: bool) -> LimitSettings {
        LimitSettings {
            server_max,
            creator_max,
            detect_origin,
        }
    }

    fn player(name: &str, origin: IpAddr) -> Creator {
        Creator::player(name, Uuid::new_v4(), origin)
    }

    fn localhost() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    fn live_session(directory: &SessionDirectory, name: &str, creator: &Creator) {
        directory.register(Session::new(
            SessionId::new(),
            SequenceName {
                name: name.to_owned(),
                creator: creator.name.clone(),
                ordinal: None,
            },
            creator.clone(),
            Location::new("world", 0.0, 64.0, 0.0),
            SessionPrefs::default(),
            None,
            std::sync::Arc::new(NullTransport::new()),
        ));
    }

    #[test]
    fn admit_holds_a_pending_slot_until_the_guard_drops() {
        let controller =
            AdmissionController::new(limits(10, 5, false), Arc::new(SessionDirectory::new()));

        let guard = controller.admit(&player("alice", localhost())).expect("admitted");
        assert_eq!(controller.pending_total(), 1);

        drop(guard);
        assert_eq!(controller.pending_total(), 0);
    }

    #[test]
    fn server_cap_counts_pending_spawns() {
        let controller =
            AdmissionController::new(limits(2, 5, false), Arc::new(SessionDirectory::new()));

        let _a = controller.admit(&player("alice", localhost())).expect("first");
        let _b = controller.admit(&player("bob", localhost())).expect("second");

        let err = controller
            .admit(&player("carol", localhost()))
            .expect_err("over cap");
        assert_eq!(err.scope, CapacityScope::Server);
        assert_eq!(err.limit, 2);
    }

    #[test]
    fn freed_slot_admits_the_next_request() {
        let controller =
            AdmissionController::new(limits(1, 5, false), Arc::new(SessionDirectory::new()));

        let guard = controller.admit(&player("alice", localhost())).expect("first");
        assert!(controller.admit(&player("bob", localhost())).is_err());

        drop(guard);
        assert!(controller.admit(&player("bob", localhost())).is_ok());
    }

    #[test]
    fn creator_cap_is_per_creator() {
        let controller =
            AdmissionController::new(limits(10, 1, false), Arc::new(SessionDirectory::new()));

        let _held = controller.admit(&player("alice", localhost())).expect("first");
        let err = controller
            .admit(&player("alice", localhost()))
            .expect_err("over creator cap");
        assert_eq!(err.scope, CapacityScope::Creator);

        assert!(controller.admit(&player("bob", localhost())).is_ok());
    }

    #[test]
    fn live_sessions_count_toward_caps() {
        let directory = Arc::new(SessionDirectory::new());
        let alice = player("alice", localhost());
        live_session(&directory, "ghost_1", &alice);

        let controller = AdmissionController::new(limits(10, 1, false), directory);
        let err = controller.admit(&alice).expect_err("live session fills the cap");
        assert_eq!(err.scope, CapacityScope::Creator);
    }

    #[test]
    fn privileged_creators_bypass_caps_but_occupy_slots() {
        let controller =
            AdmissionController::new(limits(1, 1, false), Arc::new(SessionDirectory::new()));

        let admin = player("admin", localhost()).with_privilege();
        let _first = controller.admit(&admin).expect("bypasses");
        let _second = controller.admit(&admin).expect("still bypasses");
        assert_eq!(controller.pending_total(), 2);

        let err = controller
            .admit(&player("alice", localhost()))
            .expect_err("slots are occupied");
        assert_eq!(err.scope, CapacityScope::Server);
    }

    #[test]
    fn console_is_always_privileged() {
        let controller =
            AdmissionController::new(limits(0, 0, false), Arc::new(SessionDirectory::new()));
        assert!(controller.admit(&Creator::console()).is_ok());
    }

    #[test]
    fn origin_cap_fires_on_live_sessions_from_the_same_address() {
        let home = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let cafe = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        let directory = Arc::new(SessionDirectory::new());
        live_session(&directory, "ghost_1", &player("alice", home));

        let controller = AdmissionController::new(limits(10, 1, true), directory);
        let err = controller
            .admit(&player("bob", home))
            .expect_err("address already at cap");
        assert_eq!(err.scope, CapacityScope::Origin);

        assert!(controller.admit(&player("carol", cafe)).is_ok());
    }
}
