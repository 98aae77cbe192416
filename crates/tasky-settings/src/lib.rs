//! # tasky-settings
//!
//! Process configuration for the tasky scheduler.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`TaskySettings::default()`]
//! 2. **User file**: `~/.tasky/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `TASKY_*` overrides (highest priority)
//!
//! Per-user scheduling preferences live in the database, not here.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path, tasky_home};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<TaskySettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.tasky/settings.json` with env var
/// overrides. If loading fails, logs the error and returns compiled defaults.
pub fn get_settings() -> &'static TaskySettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            TaskySettings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// Returns the value back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: TaskySettings) -> std::result::Result<(), TaskySettings> {
    SETTINGS.set(settings)
}
