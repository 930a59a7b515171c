//! Session lifecycle orchestration.
//!
//! [`SessionManager`] owns the full life of every session: admission,
//! name reservation, preference resolution, entity placement, per-step
//! advancement, and teardown. The host calls [`SessionManager::tick`]
//! from its simulation thread once per step; every world mutation happens
//! inside that call. The async stages of a spawn hand their results back
//! through the task queue instead of touching engine state directly.
//!
//! Spawn pipeline, stage by stage:
//!
//! 1. `spawn` (any thread): admission check, name reservation, ticket
//!    handed to the caller.
//! 2. Blocking pool: creator preferences resolved from the store.
//! 3. Simulation thread: region pinned, entity placed, session registered
//!    and activated, command hooks queued.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use specter_core::action::ActionKind;
use specter_core::actor::Creator;
use specter_core::ids::SessionId;
use specter_core::location::Location;
use specter_host::bridge::{HostBridge, SpawnProfile};
use specter_host::transport::{NullTransport, SessionTransport};
use specter_settings::types::SpecterSettings;
use specter_store::errors::StoreError;
use specter_store::ledger::IdentityLedger;
use specter_store::prefs::{PreferenceStore, SessionPrefs};

use crate::action::ActionSetting;
use crate::admission::AdmissionController;
use crate::commands::{self, DeferredCommands};
use crate::directory::SessionDirectory;
use crate::errors::{SpawnError, SpawnPipelineError};
use crate::naming::NameRegistry;
use crate::session::{Session, SessionState};
use crate::tasks::{PendingSpawn, SimTask, TaskReceiver, TaskSender, task_queue};

const SPAWNED_COUNTER: &str = "specter_sessions_spawned_total";
const REMOVED_COUNTER: &str = "specter_sessions_removed_total";
const SPAWN_FAILURE_COUNTER: &str = "specter_spawn_failures_total";

/// Reason used when a removal does not carry one.
const DEFAULT_REMOVAL_REASON: &str = "removed";

/// Everything needed to request a session.
#[derive(Clone)]
pub struct SpawnRequest {
    /// Who is asking.
    pub creator: Creator,
    /// Where the entity enters the world.
    pub at: Location,
    /// Explicit display name; `None` generates one from the template.
    pub custom_name: Option<String>,
    /// Lifespan override; `None` falls back to the configured default.
    pub lifespan: Option<Duration>,
    /// Transport for kick text; `None` attaches a discarding one.
    pub transport: Option<Arc<dyn SessionTransport>>,
}

impl SpawnRequest {
    /// A request with no custom name, no lifespan override, and no
    /// transport.
    #[must_use]
    pub fn new(creator: Creator, at: Location) -> Self {
        Self {
            creator,
            at,
            custom_name: None,
            lifespan: None,
            transport: None,
        }
    }
}

/// Receipt for an admitted spawn.
///
/// The display name is reserved the moment the ticket exists; the session
/// itself arrives once the simulation thread places the entity.
#[derive(Debug)]
pub struct SpawnTicket {
    name: String,
    receiver: oneshot::Receiver<Result<Arc<Session>, SpawnPipelineError>>,
}

impl SpawnTicket {
    /// The reserved display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the spawn to finish on the simulation thread.
    pub async fn wait(self) -> Result<Arc<Session>, SpawnPipelineError> {
        match self.receiver.await {
            Ok(result) => result,
            Err(_) => Err(SpawnPipelineError::Internal(anyhow::anyhow!(
                "spawn pipeline dropped before responding"
            ))),
        }
    }
}

/// Owner of every session on this host.
pub struct SessionManager {
    settings: Arc<SpecterSettings>,
    bridge: Arc<dyn HostBridge>,
    directory: Arc<SessionDirectory>,
    naming: NameRegistry,
    admission: AdmissionController,
    ledger: Arc<IdentityLedger>,
    prefs: Arc<PreferenceStore>,
    tasks_tx: TaskSender,
    tasks_rx: Mutex<TaskReceiver>,
    runtime: tokio::runtime::Handle,
}

impl SessionManager {
    /// Wire a manager over the host bridge and stores.
    ///
    /// `runtime` is the handle spawn requests use for their blocking
    /// stage; `spawn` itself may be called from any thread, the
    /// simulation thread included.
    #[must_use]
    pub fn new(
        settings: Arc<SpecterSettings>,
        bridge: Arc<dyn HostBridge>,
        ledger: Arc<IdentityLedger>,
        prefs: Arc<PreferenceStore>,
        runtime: tokio::runtime::Handle,
    ) -> Arc<Self> {
        let directory = Arc::new(SessionDirectory::new());
        let naming = NameRegistry::new(
            settings.naming.template.clone(),
            settings.naming.max_length,
        );
        let admission = AdmissionController::new(settings.limits.clone(), Arc::clone(&directory));
        let (tasks_tx, tasks_rx) = task_queue();
        Arc::new(Self {
            settings,
            bridge,
            directory,
            naming,
            admission,
            ledger,
            prefs,
            tasks_tx,
            tasks_rx: Mutex::new(tasks_rx),
            runtime,
        })
    }

    /// The shared session directory, for wiring background loops.
    #[must_use]
    pub fn directory(&self) -> Arc<SessionDirectory> {
        Arc::clone(&self.directory)
    }

    /// A sender onto the simulation task queue.
    #[must_use]
    pub fn task_sender(&self) -> TaskSender {
        self.tasks_tx.clone()
    }

    // ── spawn pipeline ──

    /// Request a session. Synchronous stages (admission and name
    /// reservation) fail fast; the rest completes on later `tick` calls
    /// and resolves the returned ticket.
    #[instrument(skip(self, request), fields(creator = %request.creator, world = %request.at.world))]
    pub fn spawn(&self, request: SpawnRequest) -> Result<SpawnTicket, SpawnPipelineError> {
        let guard = self.admission.admit(&request.creator)?;
        let name = match &request.custom_name {
            Some(custom) => self.naming.custom(&request.creator, custom)?,
            None => self.naming.register(&request.creator),
        };

        let id = SessionId::new();
        let expires_at = expiry(
            request
                .lifespan
                .or_else(|| self.settings.lifecycle.default_lifespan()),
        );
        let transport = request
            .transport
            .unwrap_or_else(|| Arc::new(NullTransport::new()) as Arc<dyn SessionTransport>);
        debug!(session = %id, name = %name, "spawn admitted");

        let (responder, receiver) = oneshot::channel();
        let ticket = SpawnTicket {
            name: name.name.clone(),
            receiver,
        };

        let prefs_store = Arc::clone(&self.prefs);
        let creator = request.creator;
        let player = creator.player_id();
        let at = request.at;
        let tasks = self.tasks_tx.clone();
        let _ = self.runtime.spawn_blocking(move || {
            let prefs = prefs_store.resolve(player).unwrap_or_else(|err| {
                warn!(error = %err, "preference lookup failed, using defaults");
                SessionPrefs::default()
            });
            tasks.send(SimTask::FinishSpawn(Box::new(PendingSpawn {
                id,
                name,
                creator,
                at,
                prefs,
                expires_at,
                transport,
                responder,
                guard,
            })));
        });

        Ok(ticket)
    }

    fn finish_spawn(&self, pending: PendingSpawn) {
        let PendingSpawn {
            id,
            name,
            creator,
            at,
            prefs,
            expires_at,
            transport,
            responder,
            guard,
        } = pending;

        self.bridge.force_load_region(&at);

        let profile = SpawnProfile {
            id,
            name: name.name.clone(),
            at: at.clone(),
            invulnerable: prefs.invulnerable,
            collidable: prefs.collidable,
            pickup_items: prefs.pickup_items,
            skin_source: if prefs.skin { creator.player_id() } else { None },
        };

        if let Err(err) = self.bridge.spawn_entity(&profile) {
            warn!(session = %id, name = %name, error = %err, "entity placement failed");
            counter!(SPAWN_FAILURE_COUNTER).increment(1);
            self.naming.unregister(&name);
            drop(guard);
            let _ = responder.send(Err(SpawnPipelineError::from(SpawnError::from(err))));
            return;
        }

        let session = Session::new(id, name, creator, at, prefs, expires_at, transport);
        // Register before releasing the admission slot so the session is
        // never invisible to both counts at once.
        self.directory.register(Arc::clone(&session));
        drop(guard);

        self.ledger.record(id);
        let _ = session.set_state(SessionState::Active);

        if session.prefs.look_at_entity {
            session.set_action(ActionKind::LookAtNearestEntity, ActionSetting::Continuous);
        }
        self.queue_spawn_hooks(&session);

        info!(
            session = %id,
            name = session.name_str(),
            creator = %session.creator,
            "session active"
        );
        counter!(SPAWNED_COUNTER).increment(1);
        let _ = responder.send(Ok(session));
    }

    fn queue_spawn_hooks(&self, session: &Session) {
        let due_tick = self.settings.lifecycle.command_delay_ticks;
        let preparing = commands::normalize_all(&self.settings.commands.preparing);
        if !preparing.is_empty() {
            session.push_commands(DeferredCommands {
                due_tick,
                as_session: false,
                lines: preparing,
            });
        }
        let on_spawn = commands::normalize_all(&self.settings.commands.on_spawn_self);
        if !on_spawn.is_empty() {
            session.push_commands(DeferredCommands {
                due_tick,
                as_session: true,
                lines: on_spawn,
            });
        }
    }

    // ── simulation step ──

    /// Run one simulation step: drain queued tasks, then advance every
    /// live session. Must be called from the thread that owns the world.
    pub fn tick(&self) {
        self.drain_tasks();
        self.advance_sessions();
    }

    fn drain_tasks(&self) {
        let tasks = self.tasks_rx.lock().drain();
        for task in tasks {
            debug!(task = task.label(), "simulation task");
            match task {
                SimTask::FinishSpawn(pending) => self.finish_spawn(*pending),
                SimTask::EvictAll { reason, notice } => {
                    let _ = self.evict_all(&reason, notice.as_deref());
                }
                SimTask::EvictCreator { creator, reason } => {
                    let _ = self.evict_creator(&creator, &reason);
                }
            }
        }
    }

    fn advance_sessions(&self) {
        let now = Utc::now();
        for session in self.directory.all() {
            if !session.is_live() {
                continue;
            }
            let tick = session.advance_tick();

            // Lifespans are checked on a 20-tick stride; sub-second
            // precision is wasted on a once-per-session deadline.
            if tick % 20 == 0 && session.expired(now) {
                info!(session = %session.id, name = session.name_str(), "lifespan elapsed");
                self.remove_session(&session, "lifespan ends");
                self.bridge.notify(
                    &session.creator.name,
                    &format!("[specter] {} removed, lifespan ends", session.name_str()),
                );
                continue;
            }

            if tick == 0 {
                // The world nudges a freshly wired entity; discard that
                // motion and pin it back to the requested spawn point.
                self.bridge.cancel_pending_motion(session.id);
                self.bridge.tick_entity(session.id);
                self.bridge.teleport(session.id, &session.spawn_at);
            } else {
                self.bridge.tick_entity(session.id);
            }

            session.run_scheduled_action(self.bridge.as_ref());

            for batch in session.take_due_commands(tick) {
                for err in commands::dispatch(
                    self.bridge.as_ref(),
                    &session,
                    &batch.lines,
                    batch.as_session,
                ) {
                    warn!(session = %session.id, error = %err, "spawn hook command failed");
                }
            }
        }
    }

    // ── removal ──

    /// Remove the session holding `name`. Returns whether one existed.
    pub fn remove_by_name(&self, name: &str, reason: Option<&str>) -> bool {
        let Some(session) = self.directory.get_by_name(name) else {
            return false;
        };
        self.remove_session(&session, reason.unwrap_or(DEFAULT_REMOVAL_REASON));
        true
    }

    /// Remove every live session, broadcasting `notice` when at least one
    /// was removed. Returns the removal count.
    pub fn evict_all(&self, reason: &str, notice: Option<&str>) -> usize {
        let mut removed = 0;
        for session in self.directory.all() {
            if !session.is_live() {
                continue;
            }
            self.remove_session(&session, reason);
            removed += 1;
        }
        if removed > 0 {
            if let Some(notice) = notice {
                self.bridge.broadcast(notice);
            }
        }
        removed
    }

    /// Remove every live session belonging to `creator`. Returns the
    /// removal count.
    pub fn evict_creator(&self, creator: &str, reason: &str) -> usize {
        let mut removed = 0;
        for session in self.directory.by_creator(creator) {
            if !session.is_live() {
                continue;
            }
            self.remove_session(&session, reason);
            removed += 1;
        }
        removed
    }

    fn remove_session(&self, session: &Arc<Session>, reason: &str) {
        let previous = session.set_state(SessionState::Removing);
        if matches!(previous, SessionState::Removing | SessionState::Disposed) {
            return;
        }

        // The session can still act here; farewell commands run before
        // anything is torn down.
        let farewell = commands::normalize_all(&self.settings.commands.on_remove_self);
        for err in commands::dispatch(self.bridge.as_ref(), session, &farewell, true) {
            warn!(session = %session.id, error = %err, "pre-removal command failed");
        }

        if self.settings.lifecycle.drop_inventory_on_removal {
            self.bridge.perform_action(session.id, ActionKind::DropInventory);
        }

        let kick = format!("[specter] {reason}");
        session.transport.send_text(&kick);
        session.transport.close();
        self.bridge.remove_entity(session.id, &kick);

        let destroy = commands::normalize_all(&self.settings.commands.destroy);
        for err in commands::dispatch(self.bridge.as_ref(), session, &destroy, false) {
            warn!(session = %session.id, error = %err, "destroy command failed");
        }

        let _ = self.directory.deregister(session.id);
        self.naming.unregister(&session.name);
        session.clear_action();
        let _ = session.set_state(SessionState::Disposed);

        counter!(REMOVED_COUNTER).increment(1);
        info!(session = %session.id, name = session.name_str(), reason, "session removed");
    }

    /// React to a session's entity dying.
    ///
    /// When death kicks are on, the entity's health is restored to max
    /// before removal so the identity never tears down mid-death-screen,
    /// then the session is removed with the death message as the reason.
    pub fn handle_death(&self, id: SessionId, death_message: &str) {
        let Some(session) = self.directory.get(id) else {
            return;
        };
        if !self.settings.lifecycle.kick_on_death {
            return;
        }
        if let Some(max) = self.bridge.max_health(id) {
            self.bridge.set_health(id, max);
        }
        let message = death_message.trim();
        let reason = if message.is_empty() {
            DEFAULT_REMOVAL_REASON
        } else {
            message
        };
        self.remove_session(&session, reason);
    }

    // ── queries ──

    /// Session by id.
    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.directory.get(id)
    }

    /// Session by display name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<Arc<Session>> {
        self.directory.get_by_name(name)
    }

    /// Every registered session.
    #[must_use]
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.directory.all()
    }

    /// Every session belonging to `creator`.
    #[must_use]
    pub fn sessions_of(&self, creator: &str) -> Vec<Arc<Session>> {
        self.directory.by_creator(creator)
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.directory.count()
    }

    /// Whether `name` belongs to a simulated session rather than a real
    /// player.
    #[must_use]
    pub fn is_simulated(&self, name: &str) -> bool {
        self.directory.is_session(name)
    }

    /// Creator of the session holding `name`.
    #[must_use]
    pub fn creator_of(&self, name: &str) -> Option<Creator> {
        self.directory
            .get_by_name(name)
            .map(|session| session.creator.clone())
    }

    /// Whether this player identity has ever backed a session, on any
    /// run of the host. Login paths use it to refuse hijacked identities.
    #[must_use]
    pub fn was_identity_used(&self, player: Uuid) -> bool {
        self.ledger.was_ever_used(player)
    }

    /// Schedule an action on the named session. Returns whether a live
    /// session accepted it.
    pub fn set_action(&self, name: &str, kind: ActionKind, setting: ActionSetting) -> bool {
        match self.directory.get_by_name(name) {
            Some(session) if session.is_live() => {
                session.set_action(kind, setting);
                true
            }
            _ => false,
        }
    }

    // ── shutdown ──

    /// Remove every session and flush the identity ledger to disk.
    pub fn shutdown(&self) -> Result<(), StoreError> {
        let removed = self.evict_all(DEFAULT_REMOVAL_REASON, None);
        let flushed = self.ledger.flush()?;
        info!(removed, flushed, "engine shut down");
        Ok(())
    }
}

/// Absolute deadline for a lifespan, `None` when unlimited or out of
/// calendar range.
fn expiry(lifespan: Option<Duration>) -> Option<DateTime<Utc>> {
    let lifespan = lifespan?;
    let delta = chrono::Duration::from_std(lifespan).ok()?;
    Utc::now().checked_add_signed(delta)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
