//! The per-session record shared between the manager and its background
//! loops.
//!
//! Identity, creator, spawn point and resolved preferences are fixed at
//! creation. Everything mutable (state, tick counter, scheduled action,
//! deferred command batches) sits behind its own lock or atomic so read
//! paths never contend on a single session-wide lock.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use specter_core::actor::Creator;
use specter_core::ids::SessionId;
use specter_core::location::Location;
use specter_host::transport::SessionTransport;
use specter_store::prefs::SessionPrefs;

use crate::action::ScheduledAction;
use crate::commands::DeferredCommands;
use crate::naming::SequenceName;

/// Where a session is in its life.
///
/// Transitions only move forward: `Resolving` → `Spawning` → `Active` →
/// `Removing` → `Disposed`. A session is visible to queries only while
/// `Active`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Identity and preferences are being resolved off-thread; no entity
    /// exists yet.
    Resolving,
    /// The entity is being placed into the world.
    Spawning,
    /// Fully joined; ticked every simulation step.
    Active,
    /// Teardown in progress.
    Removing,
    /// Fully torn down. Terminal.
    Disposed,
}

impl SessionState {
    /// Whether the session participates in simulation and queries.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, SessionState::Active)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Resolving => "resolving",
            SessionState::Spawning => "spawning",
            SessionState::Active => "active",
            SessionState::Removing => "removing",
            SessionState::Disposed => "disposed",
        };
        f.write_str(label)
    }
}

/// One simulated player session.
pub struct Session {
    /// Stable identity for the whole life of the session.
    pub id: SessionId,
    /// Reserved display name, returned to the registry on removal.
    pub name: SequenceName,
    /// Who asked for this session.
    pub creator: Creator,
    /// Where the entity entered the world.
    pub spawn_at: Location,
    /// Preferences resolved at creation; later edits affect new sessions only.
    pub prefs: SessionPrefs,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Instant after which the session is removed, if a lifespan was set.
    pub expires_at: Option<DateTime<Utc>>,
    /// Channel used to deliver kick text before the entity is removed.
    pub transport: Arc<dyn SessionTransport>,

    state: Mutex<SessionState>,
    ticks: AtomicU64,
    pub(crate) action: Mutex<Option<ScheduledAction>>,
    pending_commands: Mutex<Vec<DeferredCommands>>,
}

impl Session {
    /// A new session handle in the `Spawning` state.
    #[must_use]
    pub fn new(
        id: SessionId,
        name: SequenceName,
        creator: Creator,
        spawn_at: Location,
        prefs: SessionPrefs,
        expires_at: Option<DateTime<Utc>>,
        transport: Arc<dyn SessionTransport>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            name,
            creator,
            spawn_at,
            prefs,
            created_at: Utc::now(),
            expires_at,
            transport,
            state: Mutex::new(SessionState::Spawning),
            ticks: AtomicU64::new(0),
            action: Mutex::new(None),
            pending_commands: Mutex::new(Vec::new()),
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Move to `next`, returning the state being replaced.
    ///
    /// Callers tearing a session down use the returned value to detect a
    /// removal already in flight.
    pub fn set_state(&self, next: SessionState) -> SessionState {
        std::mem::replace(&mut *self.state.lock(), next)
    }

    /// Whether the session participates in simulation and queries.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.state().is_live()
    }

    /// The display name as a plain string.
    #[must_use]
    pub fn name_str(&self) -> &str {
        &self.name.name
    }

    /// Ticks advanced so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Advance the tick counter, returning this step's tick number.
    ///
    /// Tick numbers start at zero, so the first advance returns 0.
    pub fn advance_tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::Relaxed)
    }

    /// Whether the lifespan, if any, has elapsed at `now`.
    #[must_use]
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| now > deadline)
    }

    /// Queue a command batch for a later tick.
    pub fn push_commands(&self, batch: DeferredCommands) {
        self.pending_commands.lock().push(batch);
    }

    /// Remove and return every queued batch due at or before `tick`.
    pub fn take_due_commands(&self, tick: u64) -> Vec<DeferredCommands> {
        let mut pending = self.pending_commands.lock();
        let (due, later): (Vec<_>, Vec<_>) =
            pending.drain(..).partition(|batch| batch.due_tick <= tick);
        *pending = later;
        due
    }
}

// Manual impl: `transport` is a trait object without a `Debug` bound.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("creator", &self.creator)
            .field("spawn_at", &self.spawn_at)
            .field("prefs", &self.prefs)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("state", &self.state())
            .field("ticks", &self.tick_count())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use specter_host::transport::NullTransport;
    use std::net::{IpAddr, Ipv4Addr};
    use uuid::Uuid;

    fn session(expires_at: Option<DateTime<Utc>>) -> Arc<Session> {
        Session::new(
            SessionId::new(),
            SequenceName {
                name: "ghost_1".into(),
                creator: "alice".into(),
                ordinal: Some(1),
            },
            Creator::player("alice", Uuid::new_v4(), IpAddr::V4(Ipv4Addr::LOCALHOST)),
            Location::new("world", 0.0, 64.0, 0.0),
            SessionPrefs::default(),
            expires_at,
            Arc::new(NullTransport::new()),
        )
    }

    #[test]
    fn set_state_returns_the_previous_state() {
        let session = session(None);
        assert_eq!(session.state(), SessionState::Spawning);

        assert_eq!(session.set_state(SessionState::Active), SessionState::Spawning);
        assert!(session.is_live());

        assert_eq!(session.set_state(SessionState::Removing), SessionState::Active);
        assert_eq!(session.set_state(SessionState::Disposed), SessionState::Removing);
        assert!(!session.is_live());
    }

    #[test]
    fn only_active_counts_as_live() {
        assert!(SessionState::Active.is_live());
        for state in [
            SessionState::Resolving,
            SessionState::Spawning,
            SessionState::Removing,
            SessionState::Disposed,
        ] {
            assert!(!state.is_live(), "{state} must not be live");
        }
    }

    #[test]
    fn ticks_start_at_zero_and_advance() {
        let session = session(None);
        assert_eq!(session.tick_count(), 0);
        assert_eq!(session.advance_tick(), 0);
        assert_eq!(session.advance_tick(), 1);
        assert_eq!(session.tick_count(), 2);
    }

    #[test]
    fn expiry_needs_a_deadline_in_the_past() {
        let eternal = session(None);
        assert!(!eternal.expired(Utc::now()));

        let now = Utc::now();
        let ending = session(Some(now + Duration::seconds(60)));
        assert!(!ending.expired(now));
        assert!(ending.expired(now + Duration::seconds(61)));
    }

    #[test]
    fn due_commands_leave_later_batches_queued() {
        let session = session(None);
        session.push_commands(DeferredCommands {
            due_tick: 20,
            as_session: false,
            lines: vec!["say early".into()],
        });
        session.push_commands(DeferredCommands {
            due_tick: 40,
            as_session: true,
            lines: vec!["say late".into()],
        });

        assert!(session.take_due_commands(19).is_empty());

        let due = session.take_due_commands(20);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].lines, vec!["say early".to_owned()]);

        let rest = session.take_due_commands(40);
        assert_eq!(rest.len(), 1);
        assert!(rest[0].as_session);
        assert!(session.take_due_commands(u64::MAX).is_empty());
    }
}
