//! Session transports.
//!
//! A simulated session occupies a player slot but has no real network
//! endpoint. The engine still needs somewhere to deliver connection-scoped
//! text (most importantly the kick message on removal), so every session
//! carries a [`SessionTransport`]. The production implementation is
//! [`NullTransport`], which accepts everything and sends nothing anywhere.

use std::sync::atomic::{AtomicBool, Ordering};

/// Connection-shaped sink for one session.
pub trait SessionTransport: Send + Sync {
    /// Deliver text addressed to the client side of the session.
    fn send_text(&self, text: &str);

    /// Tear the connection down. Idempotent.
    fn close(&self);

    /// Whether the transport has not been closed yet.
    fn is_open(&self) -> bool;
}

/// Transport that discards all traffic.
///
/// Fed into the host's simulation exactly like a real connection would be,
/// so the host never special-cases simulated sessions.
#[derive(Debug, Default)]
pub struct NullTransport {
    closed: AtomicBool,
}

impl NullTransport {
    /// A fresh, open transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionTransport for NullTransport {
    fn send_text(&self, _text: &str) {}

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
