//! # specter-core
//!
//! Foundation types for the specter simulated-session engine.
//!
//! This crate provides the shared vocabulary that all other specter crates
//! depend on:
//!
//! - **Branded IDs**: [`ids::SessionId`] as a newtype over UUID v4
//! - **Actors**: [`actor::Creator`] with player/console kinds, privilege, and
//!   network origin
//! - **World**: [`location::Location`] for spawn poses and region math
//! - **Actions**: [`action::ActionKind`], the closed set of scripted behaviors
//! - **Text**: [`text::truncate_chars`] for display-name-safe truncation
//! - **Logging**: [`logging::init_subscriber`] for `tracing` setup
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other specter crates.

#![deny(unsafe_code)]

pub mod action;
pub mod actor;
pub mod ids;
pub mod location;
pub mod logging;
pub mod text;
