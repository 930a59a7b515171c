//! Simulated-session engine.
//!
//! Drives "fake" player sessions on a game host:
//!
//! - Admission-capped creation with a staged spawn pipeline
//! - Generated display names from per-creator ordinal pools
//! - A durable ledger of every identity ever simulated
//! - Scheduled gameplay actions and scripted command hooks
//! - Background loops shedding sessions when the server slows down or
//!   their creators go offline
//!
//! # Crate Position
//!
//! Top of the workspace. Builds on `specter-core` (vocabulary types),
//! `specter-host` (bridge and transport seams), `specter-settings`
//! (configuration), and `specter-store` (identity ledger and creator
//! preferences). Hosts embed this crate, call
//! [`SessionManager::tick`] once per step from their simulation thread,
//! and hand the background loops a runtime to live on.

#![deny(unsafe_code)]

pub mod action;
pub mod admission;
pub mod commands;
pub mod directory;
pub mod errors;
pub mod manager;
pub mod naming;
pub mod reconciler;
pub mod relay;
pub mod session;
pub mod tasks;
pub mod watchdog;

pub use action::{ActionSetting, ScheduledAction};
pub use directory::SessionDirectory;
pub use errors::{
    CapacityError, CapacityScope, InvalidNameError, ScriptedCommandError, SpawnError,
    SpawnPipelineError,
};
pub use manager::{SessionManager, SpawnRequest, SpawnTicket};
pub use naming::{NameRegistry, SequenceName};
pub use reconciler::PresenceReconciler;
pub use relay::{LocalRelay, MessageRelay, RelayError, RosterSnapshot};
pub use session::{Session, SessionState};
pub use tasks::{SimTask, TaskSender};
pub use watchdog::PerformanceWatchdog;
