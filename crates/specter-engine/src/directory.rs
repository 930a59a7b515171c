//! Indexed lookup over every registered session.
//!
//! Three indexes (id, display name, creator name) update together under
//! one write lock, so readers never observe a half-registered session.
//! The live-session gauge is refreshed on every mutation.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use metrics::gauge;
use parking_lot::RwLock;

use specter_core::actor::Creator;
use specter_core::ids::SessionId;

use crate::session::Session;

const LIVE_GAUGE: &str = "specter_sessions_live";

#[derive(Default)]
struct Inner {
    by_id: HashMap<SessionId, Arc<Session>>,
    by_name: HashMap<String, SessionId>,
    by_creator: HashMap<String, Vec<SessionId>>,
}

/// Registered sessions, indexed for the lookups the engine actually does.
#[derive(Default)]
pub struct SessionDirectory {
    inner: RwLock<Inner>,
}

impl SessionDirectory {
    /// An empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session to all indexes.
    pub fn register(&self, session: Arc<Session>) {
        let mut inner = self.inner.write();
        let _ = inner.by_name.insert(session.name_str().to_owned(), session.id);
        inner
            .by_creator
            .entry(session.creator.name.clone())
            .or_default()
            .push(session.id);
        let _ = inner.by_id.insert(session.id, session);
        gauge!(LIVE_GAUGE).set(inner.by_id.len() as f64);
    }

    /// Remove a session from all indexes, returning it if it was present.
    pub fn deregister(&self, id: SessionId) -> Option<Arc<Session>> {
        let mut inner = self.inner.write();
        let session = inner.by_id.remove(&id)?;
        let _ = inner.by_name.remove(session.name_str());
        let emptied = match inner.by_creator.get_mut(&session.creator.name) {
            Some(ids) => {
                ids.retain(|held| *held != id);
                ids.is_empty()
            }
            None => false,
        };
        if emptied {
            let _ = inner.by_creator.remove(&session.creator.name);
        }
        gauge!(LIVE_GAUGE).set(inner.by_id.len() as f64);
        Some(session)
    }

    /// Session by id.
    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.inner.read().by_id.get(&id).cloned()
    }

    /// Session by exact display name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<Arc<Session>> {
        let inner = self.inner.read();
        let id = inner.by_name.get(name)?;
        inner.by_id.get(id).cloned()
    }

    /// Every session belonging to this creator.
    #[must_use]
    pub fn by_creator(&self, creator: &str) -> Vec<Arc<Session>> {
        let inner = self.inner.read();
        inner
            .by_creator
            .get(creator)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.by_id.get(id).cloned())
            .collect()
    }

    /// Every registered session.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<Session>> {
        self.inner.read().by_id.values().cloned().collect()
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.read().by_id.len()
    }

    /// Number of sessions this creator holds.
    #[must_use]
    pub fn count_by_creator(&self, creator: &str) -> usize {
        self.inner
            .read()
            .by_creator
            .get(creator)
            .map_or(0, Vec::len)
    }

    /// Number of sessions whose creator connected from `origin`.
    #[must_use]
    pub fn count_by_origin(&self, origin: IpAddr) -> usize {
        self.inner
            .read()
            .by_id
            .values()
            .filter(|session| session.creator.origin() == Some(origin))
            .count()
    }

    /// The distinct creators holding at least one session.
    #[must_use]
    pub fn creators(&self) -> Vec<Creator> {
        let inner = self.inner.read();
        let mut seen: HashMap<String, Creator> = HashMap::new();
        for session in inner.by_id.values() {
            let _ = seen
                .entry(session.creator.name.clone())
                .or_insert_with(|| session.creator.clone());
        }
        seen.into_values().collect()
    }

    /// Whether `name` is the display name of a registered session.
    #[must_use]
    pub fn is_session(&self, name: &str) -> bool {
        self.inner.read().by_name.contains_key(name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
