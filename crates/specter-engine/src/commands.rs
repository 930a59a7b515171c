//! Scripted command hooks.
//!
//! Configured command lists run at fixed points in a session's life:
//! preparation commands as the console shortly after spawn, self commands
//! as the session itself, and destroy commands as the console during
//! removal. Lines support three placeholders, expanded per session:
//! `%p` the session's display name, `%u` its id, `%c` the creator's name.

use specter_host::bridge::{CommandActor, HostBridge};

use crate::errors::ScriptedCommandError;
use crate::session::Session;

/// A command batch queued against a future session tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeferredCommands {
    /// Session tick at which the batch becomes due.
    pub due_tick: u64,
    /// Run as the session itself instead of the console.
    pub as_session: bool,
    /// Normalized lines, placeholders not yet expanded.
    pub lines: Vec<String>,
}

/// Clean one configured line: trim, drop a single leading slash, reject
/// blanks.
#[must_use]
pub fn normalize(line: &str) -> Option<String> {
    let line = line.trim();
    let line = line.strip_prefix('/').unwrap_or(line).trim();
    if line.is_empty() {
        None
    } else {
        Some(line.to_owned())
    }
}

/// Normalize a configured list, dropping blank entries.
#[must_use]
pub fn normalize_all(lines: &[String]) -> Vec<String> {
    lines.iter().filter_map(|line| normalize(line)).collect()
}

/// Expand per-session placeholders in one line.
#[must_use]
pub fn substitute(line: &str, session: &Session) -> String {
    line.replace("%p", session.name_str())
        .replace("%u", &session.id.to_string())
        .replace("%c", &session.creator.name)
}

/// Dispatch each line against the host, as the console or as the session.
///
/// A rejected line is collected and the rest still run; one bad hook
/// never blocks the others.
pub fn dispatch(
    bridge: &dyn HostBridge,
    session: &Session,
    lines: &[String],
    as_session: bool,
) -> Vec<ScriptedCommandError> {
    let actor = if as_session {
        CommandActor::Session(session.id)
    } else {
        CommandActor::Console
    };

    let mut failures = Vec::new();
    for line in lines {
        let command = substitute(line, session);
        if !bridge.execute_as(actor, &command) {
            failures.push(ScriptedCommandError {
                command,
                reason: "host rejected the command".into(),
            });
        }
    }
    failures
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
