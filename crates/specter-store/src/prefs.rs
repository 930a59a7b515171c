//! Per-creator spawn preferences.
//!
//! Creators can override how their sessions spawn (damage immunity,
//! collision, pickup, skin copy, the look-at idle behavior). Keys without a
//! stored row fall back to shipped defaults, so the table stays tiny.

use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use crate::connection::ConnectionPool;
use crate::errors::Result;

/// A spawn preference key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrefKey {
    /// Session entity ignores damage.
    Invulnerable,
    /// Session entity has a collision box.
    Collidable,
    /// Session idles by facing the nearest living entity.
    LookAtEntity,
    /// Session entity picks up nearby item drops.
    PickupItems,
    /// Session copies the creator's skin.
    Skin,
}

impl PrefKey {
    /// All keys, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Invulnerable,
        Self::Collidable,
        Self::LookAtEntity,
        Self::PickupItems,
        Self::Skin,
    ];

    /// Key string stored in the `creator_preferences` table.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invulnerable => "invulnerable",
            Self::Collidable => "collidable",
            Self::LookAtEntity => "look_at_entity",
            Self::PickupItems => "pickup_items",
            Self::Skin => "skin",
        }
    }

    /// Value used when a creator never set this key.
    #[must_use]
    pub fn default_value(self) -> bool {
        match self {
            Self::Invulnerable | Self::Collidable | Self::PickupItems | Self::Skin => true,
            Self::LookAtEntity => false,
        }
    }
}

/// The fully resolved preference set one session spawns with.
///
/// Captured once during spawn resolution; later preference edits only
/// affect future sessions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionPrefs {
    /// Session entity ignores damage.
    pub invulnerable: bool,
    /// Session entity has a collision box.
    pub collidable: bool,
    /// Session idles by facing the nearest living entity.
    pub look_at_entity: bool,
    /// Session entity picks up nearby item drops.
    pub pickup_items: bool,
    /// Session copies the creator's skin.
    pub skin: bool,
}

impl Default for SessionPrefs {
    fn default() -> Self {
        Self {
            invulnerable: PrefKey::Invulnerable.default_value(),
            collidable: PrefKey::Collidable.default_value(),
            look_at_entity: PrefKey::LookAtEntity.default_value(),
            pickup_items: PrefKey::PickupItems.default_value(),
            skin: PrefKey::Skin.default_value(),
        }
    }
}

/// Typed reads and writes over the `creator_preferences` table.
pub struct PreferenceStore {
    pool: ConnectionPool,
}

impl PreferenceStore {
    /// Wrap a migrated pool.
    #[must_use]
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Stored value for this creator, or the key's shipped default.
    pub fn select_or_default(&self, creator: Uuid, key: PrefKey) -> Result<bool> {
        let conn = self.pool.get()?;
        let stored: Option<i64> = conn
            .query_row(
                "SELECT value FROM creator_preferences WHERE creator_id = ?1 AND key = ?2",
                params![creator.to_string(), key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(stored.map_or_else(|| key.default_value(), |v| v != 0))
    }

    /// Store an override for this creator.
    pub fn set(&self, creator: Uuid, key: PrefKey, value: bool) -> Result<()> {
        let conn = self.pool.get()?;
        let _ = conn.execute(
            "INSERT INTO creator_preferences (creator_id, key, value, updated_at) \
             VALUES (?1, ?2, ?3, datetime('now')) \
             ON CONFLICT(creator_id, key) DO UPDATE SET \
                 value = excluded.value, updated_at = excluded.updated_at",
            params![creator.to_string(), key.as_str(), i64::from(value)],
        )?;
        Ok(())
    }

    /// Resolve the full spawn preference set for one creator.
    ///
    /// `None` (the console actor) resolves to shipped defaults without
    /// touching the database.
    pub fn resolve(&self, creator: Option<Uuid>) -> Result<SessionPrefs> {
        let Some(creator) = creator else {
            return Ok(SessionPrefs::default());
        };
        Ok(SessionPrefs {
            invulnerable: self.select_or_default(creator, PrefKey::Invulnerable)?,
            collidable: self.select_or_default(creator, PrefKey::Collidable)?,
            look_at_entity: self.select_or_default(creator, PrefKey::LookAtEntity)?,
            pickup_items: self.select_or_default(creator, PrefKey::PickupItems)?,
            skin: self.select_or_default(creator, PrefKey::Skin)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
