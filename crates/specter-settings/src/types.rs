//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` so one JSON file fits
//! the host's existing config tooling. Every section implements [`Default`]
//! with production values, and `#[serde(default)]` allows partial JSON —
//! missing fields get their default during deserialization.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings for the specter engine.
///
/// # JSON Format
///
/// All field names are camelCase. Example:
///
/// ```json
/// {
///   "limits": { "serverMax": 100, "creatorMax": 2 },
///   "watchdog": { "floorTps": 14.0 }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecterSettings {
    /// Admission caps.
    pub limits: LimitSettings,
    /// Display-name generation.
    pub naming: NamingSettings,
    /// Session lifetime behavior.
    pub lifecycle: LifecycleSettings,
    /// Scripted command hooks.
    pub commands: CommandSettings,
    /// Performance watchdog.
    pub watchdog: WatchdogSettings,
    /// Cross-node presence reconciliation.
    pub reconciler: ReconcilerSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for SpecterSettings {
    fn default() -> Self {
        Self {
            limits: LimitSettings::default(),
            naming: NamingSettings::default(),
            lifecycle: LifecycleSettings::default(),
            commands: CommandSettings::default(),
            watchdog: WatchdogSettings::default(),
            reconciler: ReconcilerSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl SpecterSettings {
    /// Correct out-of-range values in place.
    ///
    /// Called automatically during loading. Bad values are clamped with a
    /// warning rather than rejected, so a typo in one field never takes the
    /// whole engine down with a confusing startup error.
    pub fn validate(&mut self) {
        if self.naming.max_length == 0 || self.naming.max_length > 16 {
            tracing::warn!(
                max_length = self.naming.max_length,
                "naming.maxLength outside 1..=16, clamped"
            );
            self.naming.max_length = self.naming.max_length.clamp(1, 16);
        }
        if self.watchdog.floor_tps < 0.0 {
            tracing::warn!(floor_tps = self.watchdog.floor_tps, "watchdog.floorTps negative, set to 0");
            self.watchdog.floor_tps = 0.0;
        }
        if self.watchdog.floor_tps > 20.0 {
            tracing::warn!(
                floor_tps = self.watchdog.floor_tps,
                "watchdog.floorTps above the 20 TPS ceiling, clamped"
            );
            self.watchdog.floor_tps = 20.0;
        }
        if self.watchdog.interval_secs == 0 {
            tracing::warn!("watchdog.intervalSecs is 0, reset to 60");
            self.watchdog.interval_secs = 60;
        }
        if self.reconciler.interval_secs == 0 {
            tracing::warn!("reconciler.intervalSecs is 0, reset to 5");
            self.reconciler.interval_secs = 5;
        }
    }
}

/// Admission caps applied before every spawn.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LimitSettings {
    /// Max live sessions across the whole server.
    pub server_max: u32,
    /// Max live sessions per creator.
    pub creator_max: u32,
    /// Also cap by network origin: sessions whose creators share an address
    /// count against `creator_max` together. Catches alt-account dodging.
    pub detect_origin: bool,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            server_max: 1000,
            creator_max: 1,
            detect_origin: false,
        }
    }
}

/// Display-name generation for sequential session names.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NamingSettings {
    /// Base of generated names (`<template>_<n>`). Empty means "use the
    /// creator's own name as the template".
    pub template: String,
    /// Host display-name cap in characters. Generated names are truncated
    /// to fit it, suffix included.
    pub max_length: usize,
}

impl Default for NamingSettings {
    fn default() -> Self {
        Self {
            template: String::new(),
            max_length: 16,
        }
    }
}

/// Session lifetime behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LifecycleSettings {
    /// Lifespan applied when a spawn request does not carry one, in
    /// seconds. `0` means sessions persist until removed.
    pub default_lifespan_secs: u64,
    /// Ticks to wait after activation before running the spawn command
    /// hooks, giving the entity time to finish entering the world.
    pub command_delay_ticks: u64,
    /// Remove a session when its entity dies instead of leaving a corpse
    /// on the respawn screen.
    pub kick_on_death: bool,
    /// Run the drop-inventory action right before an entity is removed so
    /// carried items survive the session.
    pub drop_inventory_on_removal: bool,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            default_lifespan_secs: 0,
            command_delay_ticks: 20,
            kick_on_death: true,
            drop_inventory_on_removal: true,
        }
    }
}

impl LifecycleSettings {
    /// Default lifespan as a duration, `None` when disabled.
    #[must_use]
    pub fn default_lifespan(&self) -> Option<Duration> {
        (self.default_lifespan_secs > 0).then(|| Duration::from_secs(self.default_lifespan_secs))
    }
}

/// Scripted command hooks run around the session lifecycle.
///
/// Lines support `%p` (session name), `%u` (session identifier), and `%c`
/// (creator name) placeholders. A leading `/` is stripped; blank lines are
/// skipped.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandSettings {
    /// Run as the console shortly after a session activates.
    pub preparing: Vec<String>,
    /// Run as the session itself shortly after it activates.
    pub on_spawn_self: Vec<String>,
    /// Run as the session itself right before it is removed, while it can
    /// still execute commands.
    pub on_remove_self: Vec<String>,
    /// Run as the console while a session is being removed.
    pub destroy: Vec<String>,
}

/// Performance watchdog configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatchdogSettings {
    /// Evict all sessions when the rolling TPS sample drops below this.
    /// `0` disables the watchdog.
    pub floor_tps: f64,
    /// Seconds between health samples.
    pub interval_secs: u64,
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        Self {
            floor_tps: 0.0,
            interval_secs: 60,
        }
    }
}

impl WatchdogSettings {
    /// Whether the watchdog should run at all.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.floor_tps > 0.0
    }
}

/// Cross-node presence reconciliation configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconcilerSettings {
    /// Evict a creator's sessions once the creator is offline everywhere
    /// in the cluster.
    pub follow_quitting: bool,
    /// Seconds between reconciliation sweeps.
    pub interval_secs: u64,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            follow_quitting: true,
            interval_secs: 5,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level for the tracing subscriber (`error`..`trace`).
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_production_values() {
        let settings = SpecterSettings::default();
        assert_eq!(settings.limits.server_max, 1000);
        assert_eq!(settings.limits.creator_max, 1);
        assert!(!settings.limits.detect_origin);
        assert_eq!(settings.naming.max_length, 16);
        assert_eq!(settings.lifecycle.command_delay_ticks, 20);
        assert!(settings.lifecycle.kick_on_death);
        assert!(!settings.watchdog.enabled());
        assert!(settings.reconciler.follow_quitting);
        assert_eq!(settings.reconciler.interval_secs, 5);
    }

    #[test]
    fn partial_json_fills_missing_fields() {
        let settings: SpecterSettings =
            serde_json::from_str(r#"{"limits": {"creatorMax": 3}}"#).expect("parse");
        assert_eq!(settings.limits.creator_max, 3);
        assert_eq!(settings.limits.server_max, 1000);
        assert_eq!(settings.watchdog.interval_secs, 60);
    }

    #[test]
    fn camel_case_round_trip() {
        let settings = SpecterSettings::default();
        let json = serde_json::to_string(&settings).expect("serialize");
        assert!(json.contains("serverMax"));
        assert!(json.contains("floorTps"));
        assert!(json.contains("followQuitting"));
        let back: SpecterSettings = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.limits.server_max, settings.limits.server_max);
    }

    #[test]
    fn zero_lifespan_means_none() {
        let mut lifecycle = LifecycleSettings::default();
        assert_eq!(lifecycle.default_lifespan(), None);
        lifecycle.default_lifespan_secs = 90;
        assert_eq!(lifecycle.default_lifespan(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn validate_clamps_name_length() {
        let mut settings = SpecterSettings::default();
        settings.naming.max_length = 40;
        settings.validate();
        assert_eq!(settings.naming.max_length, 16);

        settings.naming.max_length = 0;
        settings.validate();
        assert_eq!(settings.naming.max_length, 1);
    }

    #[test]
    fn validate_clamps_floor_tps() {
        let mut settings = SpecterSettings::default();
        settings.watchdog.floor_tps = -3.0;
        settings.validate();
        assert_eq!(settings.watchdog.floor_tps, 0.0);

        settings.watchdog.floor_tps = 99.0;
        settings.validate();
        assert_eq!(settings.watchdog.floor_tps, 20.0);
    }

    #[test]
    fn validate_resets_zero_intervals() {
        let mut settings = SpecterSettings::default();
        settings.watchdog.interval_secs = 0;
        settings.reconciler.interval_secs = 0;
        settings.validate();
        assert_eq!(settings.watchdog.interval_secs, 60);
        assert_eq!(settings.reconciler.interval_secs, 5);
    }
}
