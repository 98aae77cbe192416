//! Settings types.
//!
//! Every struct is `camelCase` on disk and `#[serde(default)]`, so a partial
//! `settings.json` fills the gaps from compiled defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings for the tasky process.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskySettings {
    /// Tick loop and housekeeping slots.
    pub scheduler: SchedulerSettings,
    /// Telegram Bot API access.
    pub telegram: TelegramSettings,
    /// SQLite database.
    pub database: DatabaseSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl TaskySettings {
    /// Check values that deserialize fine but make no sense at runtime.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("scheduler.backupAt", &self.scheduler.backup_at),
            ("scheduler.retentionAt", &self.scheduler.retention_at),
            ("scheduler.archiveAt", &self.scheduler.archive_at),
        ] {
            if tasky_core::time::parse_hhmm(value).is_none() {
                return Err(SettingsError::InvalidValue(format!("{key}: {value}")));
            }
        }
        if !is_valid_tick_seconds(self.scheduler.tick_seconds) {
            return Err(SettingsError::InvalidValue(format!(
                "scheduler.tickSeconds: {}",
                self.scheduler.tick_seconds
            )));
        }
        if self.database.pool_size == 0 {
            return Err(SettingsError::InvalidValue("database.poolSize: 0".into()));
        }
        Ok(())
    }
}

/// Scheduler loop settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerSettings {
    /// Run the notification engine at all.
    pub enabled: bool,
    /// Seconds between ticks. Must divide 60 so every minute gets a tick.
    pub tick_seconds: u64,
    /// UTC time of day for automatic backups.
    pub backup_at: String,
    /// UTC time of day for retention cleanup.
    pub retention_at: String,
    /// UTC time of day for auto-archive.
    pub archive_at: String,
}

/// Tick periods that land at least once in every minute: the divisors of 60.
pub fn is_valid_tick_seconds(secs: u64) -> bool {
    secs > 0 && 60 % secs == 0
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_seconds: 60,
            backup_at: "02:00".to_string(),
            retention_at: "03:00".to_string(),
            archive_at: "03:30".to_string(),
        }
    }
}

/// Telegram Bot API settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramSettings {
    /// Bot token. The engine does not start without one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
    /// API base URL.
    pub api_base_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// `parse_mode` sent with every message.
    pub parse_mode: String,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base_url: "https://api.telegram.org".to_string(),
            timeout_ms: 10_000,
            parse_mode: "HTML".to_string(),
        }
    }
}

impl TelegramSettings {
    /// Token if present and non-blank.
    pub fn token(&self) -> Option<&str> {
        self.bot_token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

impl std::fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("parse_mode", &self.parse_mode)
            .finish()
    }
}

/// Database settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    /// Database file. Relative paths resolve against `~/.tasky`.
    pub path: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
    /// `SQLite` busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "tasky.db".to_string(),
            pool_size: 4,
            busy_timeout_ms: 5000,
        }
    }
}

impl DatabaseSettings {
    /// Absolute database path.
    pub fn resolved_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.path);
        if path.is_absolute() {
            path
        } else {
            crate::loader::tasky_home().join(path)
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
