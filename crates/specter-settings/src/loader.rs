//! Settings loading with layered sources.
//!
//! Layering, lowest to highest priority:
//! 1. Compiled defaults from [`SpecterSettings::default()`]
//! 2. A JSON file at the path the host passes in, deep-merged over defaults
//! 3. `SPECTER_*` environment variables

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::SpecterSettings;

/// Load settings from a specific file path.
///
/// A missing file is not an error: defaults plus env overrides apply. A file
/// that exists but fails to read or parse is an error, so a corrupted config
/// is noticed instead of silently ignored. The result is validated before it
/// is returned.
pub fn load_settings_from_path(path: &Path) -> Result<SpecterSettings> {
    let defaults = serde_json::to_value(SpecterSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: SpecterSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate();
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `SPECTER_*` environment variable overrides in place.
pub fn apply_env_overrides(settings: &mut SpecterSettings) {
    // ── Limits ──────────────────────────────────────────────────────
    if let Some(v) = read_env_u32("SPECTER_SERVER_MAX", 0, 100_000) {
        settings.limits.server_max = v;
    }
    if let Some(v) = read_env_u32("SPECTER_CREATOR_MAX", 0, 10_000) {
        settings.limits.creator_max = v;
    }
    if let Some(v) = read_env_bool("SPECTER_DETECT_ORIGIN") {
        settings.limits.detect_origin = v;
    }

    // ── Naming ──────────────────────────────────────────────────────
    if let Some(v) = read_env_string("SPECTER_NAME_TEMPLATE") {
        settings.naming.template = v;
    }

    // ── Lifecycle ───────────────────────────────────────────────────
    if let Some(v) = read_env_u64("SPECTER_LIFESPAN_SECS", 0, 31_536_000) {
        settings.lifecycle.default_lifespan_secs = v;
    }
    if let Some(v) = read_env_bool("SPECTER_KICK_ON_DEATH") {
        settings.lifecycle.kick_on_death = v;
    }
    if let Some(v) = read_env_bool("SPECTER_DROP_INVENTORY") {
        settings.lifecycle.drop_inventory_on_removal = v;
    }

    // ── Watchdog / reconciler ───────────────────────────────────────
    if let Some(v) = read_env_f64("SPECTER_FLOOR_TPS", 0.0, 20.0) {
        settings.watchdog.floor_tps = v;
    }
    if let Some(v) = read_env_bool("SPECTER_FOLLOW_QUITTING") {
        settings.reconciler.follow_quitting = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read_env_string("SPECTER_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

// ── Parsers ─────────────────────────────────────────────────────────────────

/// Parse a string as a boolean. Accepts true/false, 1/0, yes/no, on/off.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as an `f64` within a range.
pub fn parse_f64_range(val: &str, min: f64, max: f64) -> Option<f64> {
    let n: f64 = val.parse().ok()?;
    (n.is_finite() && n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    std::env::var(name).ok().as_deref().and_then(parse_bool)
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    std::env::var(name)
        .ok()
        .and_then(|v| parse_u32_range(&v, min, max))
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|v| parse_u64_range(&v, min, max))
}

fn read_env_f64(name: &str, min: f64, max: f64) -> Option<f64> {
    std::env::var(name)
        .ok()
        .and_then(|v| parse_f64_range(&v, min, max))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
