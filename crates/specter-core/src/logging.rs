//! Structured logging setup with `tracing`.
//!
//! Log context (session id, creator, removal reason) travels in span and
//! event fields rather than formatted strings, so the embedding host can
//! route or filter engine logs however it likes.

/// Initialize the global tracing subscriber with stderr output.
///
/// Call once at host startup. Subsequent calls are no-ops. A `RUST_LOG`
/// environment filter takes precedence over `level` when set.
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // set_global_default is a no-op if already set
    let _ = subscriber.try_init();
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
