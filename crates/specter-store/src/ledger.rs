//! Durable ledger of every identifier ever assigned to a session.
//!
//! The host's login gate refuses real connections whose account UUID was
//! ever used by a simulated session, so this set only grows. Membership
//! checks hit an in-memory image loaded at open; inserts write through to
//! `SQLite` as they happen.
//!
//! INVARIANT: the in-memory image is authoritative for reads. A failed
//! write-through is logged and retried by [`IdentityLedger::flush`] at
//! shutdown rather than dropping the identity, so the login gate never
//! weakens inside a running process.

use std::collections::HashSet;

use parking_lot::RwLock;
use rusqlite::params;
use tracing::{debug, info, warn};
use uuid::Uuid;

use specter_core::ids::SessionId;

use crate::connection::ConnectionPool;
use crate::errors::Result;

/// Append-only identity set backing the login gate.
pub struct IdentityLedger {
    pool: ConnectionPool,
    cache: RwLock<HashSet<Uuid>>,
}

impl IdentityLedger {
    /// Open the ledger over a migrated pool, loading every recorded
    /// identity into memory.
    pub fn open(pool: ConnectionPool) -> Result<Self> {
        let conn = pool.get()?;
        let mut stmt = conn.prepare("SELECT id FROM used_identities")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut cache = HashSet::new();
        for row in rows {
            let raw = row?;
            match Uuid::parse_str(&raw) {
                Ok(id) => {
                    let _ = cache.insert(id);
                }
                Err(err) => warn!(id = raw, %err, "skipping unparsable ledger row"),
            }
        }
        drop(stmt);
        drop(conn);

        debug!(count = cache.len(), "identity ledger loaded");
        Ok(Self {
            pool,
            cache: RwLock::new(cache),
        })
    }

    /// Whether this account UUID was ever assigned to a session.
    ///
    /// Memory-only; callable from the host's login thread.
    #[must_use]
    pub fn was_ever_used(&self, id: Uuid) -> bool {
        self.cache.read().contains(&id)
    }

    /// Record a newly assigned session identity.
    ///
    /// The in-memory image is updated first; the `SQLite` write-through is
    /// best-effort and backfilled by [`Self::flush`] if it fails here.
    pub fn record(&self, id: SessionId) {
        let uuid = id.as_uuid();
        if !self.cache.write().insert(uuid) {
            return;
        }
        if let Err(err) = self.insert_row(uuid) {
            warn!(id = %uuid, %err, "ledger write-through failed, will backfill on flush");
        }
    }

    /// Number of identities ever recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Whether no identity was ever recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Persist any cached identity missing from the table and checkpoint
    /// the WAL. Returns how many rows were backfilled.
    ///
    /// Called at shutdown, mirroring the gate's only hard durability point.
    pub fn flush(&self) -> Result<usize> {
        let snapshot: Vec<Uuid> = self.cache.read().iter().copied().collect();
        let conn = self.pool.get()?;

        let mut backfilled = 0;
        for id in snapshot {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO used_identities (id) VALUES (?1)",
                params![id.to_string()],
            )?;
            backfilled += inserted;
        }
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;

        if backfilled > 0 {
            info!(backfilled, "identity ledger flushed missing rows");
        }
        Ok(backfilled)
    }

    fn insert_row(&self, id: Uuid) -> Result<()> {
        let conn = self.pool.get()?;
        let _ = conn.execute(
            "INSERT OR IGNORE INTO used_identities (id) VALUES (?1)",
            params![id.to_string()],
        )?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
