//! # specter-host
//!
//! The seam between the specter engine and the game server embedding it.
//!
//! - **Bridge**: [`bridge::HostBridge`], the versioned capability trait the
//!   engine drives the host through, and [`bridge::select_bridge`] for
//!   picking an implementation at startup
//! - **Transport**: [`transport::SessionTransport`] with the
//!   [`transport::NullTransport`] null-object standing in for a real network
//!   connection
//! - **Sim**: [`sim::SimHost`], a deterministic in-memory host used by the
//!   engine test suites and host integration smoke runs
//!
//! ## Crate Position
//!
//! Depends only on `specter-core`. Real bridge implementations live with the
//! embedding host, one per supported host version.

#![deny(unsafe_code)]

pub mod bridge;
pub mod sim;
pub mod transport;
