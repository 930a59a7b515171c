//! # specter-store
//!
//! `SQLite` persistence for the specter engine.
//!
//! - **Connections**: [`connection::new_file`] / [`connection::new_in_memory`]
//!   r2d2 pools with WAL mode and pragmas applied per connection
//! - **Migrations**: [`migrations::run_migrations`], idempotent DDL
//! - **Identity ledger**: [`ledger::IdentityLedger`], the durable set of
//!   every identifier ever assigned to a session; backs the host's login
//!   gate
//! - **Preferences**: [`prefs::PreferenceStore`], per-creator spawn toggles
//!   with shipped defaults
//!
//! ## Crate Position
//!
//! Storage layer. Depended on by `specter-engine`; knows nothing about
//! sessions beyond their identifiers.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod ledger;
pub mod migrations;
pub mod prefs;

pub use connection::{ConnectionConfig, ConnectionPool, PooledConnection};
pub use errors::{Result, StoreError};
pub use ledger::IdentityLedger;
pub use prefs::{PrefKey, PreferenceStore, SessionPrefs};
