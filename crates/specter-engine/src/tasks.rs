//! Tasks posted onto the simulation thread.
//!
//! Background loops and the async spawn stages never mutate engine state
//! directly. They post a [`SimTask`] and the host's simulation thread
//! drains the queue at the top of each step, so every mutation happens on
//! the thread that owns the world. The queue is unbounded; producers
//! never block.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};

use specter_core::actor::Creator;
use specter_core::ids::SessionId;
use specter_core::location::Location;
use specter_host::transport::SessionTransport;
use specter_store::prefs::SessionPrefs;

use crate::admission::PendingGuard;
use crate::errors::SpawnPipelineError;
use crate::naming::SequenceName;
use crate::session::Session;

/// A spawn that cleared admission and preference resolution off-thread
/// and now waits for entity placement on the simulation thread.
///
/// Carries the admission guard so the pending slot stays held until the
/// session is registered or the spawn fails.
pub struct PendingSpawn {
    pub(crate) id: SessionId,
    pub(crate) name: SequenceName,
    pub(crate) creator: Creator,
    pub(crate) at: Location,
    pub(crate) prefs: SessionPrefs,
    pub(crate) expires_at: Option<DateTime<Utc>>,
    pub(crate) transport: Arc<dyn SessionTransport>,
    pub(crate) responder: oneshot::Sender<Result<Arc<Session>, SpawnPipelineError>>,
    pub(crate) guard: PendingGuard,
}

/// Work for the simulation thread.
pub enum SimTask {
    /// Place a prepared spawn into the world.
    FinishSpawn(Box<PendingSpawn>),
    /// Remove every session, optionally broadcasting a notice afterwards.
    EvictAll {
        /// Removal reason delivered with each kick.
        reason: String,
        /// Broadcast sent when at least one session was removed.
        notice: Option<String>,
    },
    /// Remove every session belonging to one creator.
    EvictCreator {
        /// Creator whose sessions are removed.
        creator: String,
        /// Removal reason delivered with each kick.
        reason: String,
    },
}

impl SimTask {
    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            SimTask::FinishSpawn(_) => "finish_spawn",
            SimTask::EvictAll { .. } => "evict_all",
            SimTask::EvictCreator { .. } => "evict_creator",
        }
    }
}

/// Posting half of the task queue.
#[derive(Clone)]
pub struct TaskSender {
    tx: mpsc::UnboundedSender<SimTask>,
}

impl TaskSender {
    /// Post a task.
    ///
    /// Quietly drops the task when the receiver is gone, which only
    /// happens during engine teardown.
    pub fn send(&self, task: SimTask) {
        let _ = self.tx.send(task);
    }
}

/// Draining half of the task queue, owned by the simulation thread.
pub struct TaskReceiver {
    rx: mpsc::UnboundedReceiver<SimTask>,
}

impl TaskReceiver {
    /// Take every task queued so far without waiting.
    pub fn drain(&mut self) -> Vec<SimTask> {
        let mut tasks = Vec::new();
        while let Ok(task) = self.rx.try_recv() {
            tasks.push(task);
        }
        tasks
    }
}

/// A connected sender/receiver pair over a fresh unbounded queue.
#[must_use]
pub fn task_queue() -> (TaskSender, TaskReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TaskSender { tx }, TaskReceiver { rx })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
