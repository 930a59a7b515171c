//! SQL DDL for the specter tables.
//!
//! Two tables: `used_identities` (the identity ledger) and
//! `creator_preferences` (per-creator spawn toggles). Both live in whatever
//! database file the embedding host hands us.

use rusqlite::Connection;

use crate::errors::Result;

/// Run all specter migrations.
///
/// Idempotent — safe to call multiple times (uses `IF NOT EXISTS`).
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(SPECTER_SCHEMA)?;
    Ok(())
}

/// Combined DDL for all specter tables.
const SPECTER_SCHEMA: &str = r"
-- Every identifier ever assigned to a simulated session.
-- Rows are never deleted: the host's login gate checks this table's
-- in-memory image to refuse real logins reusing a session identity.
CREATE TABLE IF NOT EXISTS used_identities (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Per-creator spawn preference overrides. Keys without a row fall back
-- to shipped defaults.
CREATE TABLE IF NOT EXISTS creator_preferences (
    creator_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value INTEGER NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (creator_id, key)
);

CREATE INDEX IF NOT EXISTS idx_creator_preferences_creator
    ON creator_preferences(creator_id);
";

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
