//! # specter-settings
//!
//! Configuration management with layered sources for the specter engine.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`SpecterSettings::default()`]
//! 2. **Host file** — a JSON file at a path the embedding host chooses
//!    (deep-merged over defaults)
//! 3. **Environment variables** — `SPECTER_*` overrides (highest priority)
//!
//! There is no global settings singleton: the host loads once at startup and
//! hands the engine an `Arc<SpecterSettings>`. Anything that wants a live
//! value holds that `Arc`; a restart picks up file changes.
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//! use specter_settings::load_settings_from_path;
//!
//! let settings = load_settings_from_path(Path::new("specter/settings.json"))?;
//! println!("server cap: {}", settings.limits.server_max);
//! # Ok::<(), specter_settings::SettingsError>(())
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{apply_env_overrides, deep_merge, load_settings_from_path};
pub use types::*;
