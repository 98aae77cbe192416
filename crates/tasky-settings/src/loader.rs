//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`TaskySettings::default()`]
//! 2. If `~/.tasky/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `TASKY_*` environment variable overrides (highest priority)
//! 4. Validate
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::{TaskySettings, is_valid_tick_seconds};

/// Directory holding tasky's settings and default database (`~/.tasky`).
pub fn tasky_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".tasky")
}

/// Resolve the path to the settings file (`~/.tasky/settings.json`).
pub fn settings_path() -> PathBuf {
    tasky_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<TaskySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON or the result fails validation, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<TaskySettings> {
    let mut settings = load_file_layers(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Defaults merged with the file at `path`, without env overrides.
pub fn load_file_layers(path: &Path) -> Result<TaskySettings> {
    let defaults = serde_json::to_value(TaskySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are ignored with a warning, keeping the file/default value.
pub fn apply_env_overrides(settings: &mut TaskySettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable source.
///
/// `lookup` returns the raw value of a variable, or `None` when unset.
pub fn apply_overrides_from(settings: &mut TaskySettings, lookup: impl Fn(&str) -> Option<String>) {
    let env = EnvReader { lookup };

    // ── Scheduler ───────────────────────────────────────────────────
    if let Some(v) = env.bool("TASKY_SCHEDULER_ENABLED") {
        settings.scheduler.enabled = v;
    }
    if let Some(v) = env.u64("TASKY_TICK_SECONDS", 1, 60) {
        if is_valid_tick_seconds(v) {
            settings.scheduler.tick_seconds = v;
        } else {
            tracing::warn!(value = v, "TASKY_TICK_SECONDS must divide 60, ignoring");
        }
    }

    // ── Telegram ────────────────────────────────────────────────────
    // TASKY_BOT_TOKEN wins over the conventional TELEGRAM_BOT_TOKEN
    if let Some(v) = env.string("TASKY_BOT_TOKEN").or_else(|| env.string("TELEGRAM_BOT_TOKEN")) {
        settings.telegram.bot_token = Some(v);
    }
    if let Some(v) = env.string("TASKY_TELEGRAM_API") {
        settings.telegram.api_base_url = v;
    }

    // ── Database / logging ──────────────────────────────────────────
    if let Some(v) = env.string("TASKY_DB_PATH") {
        settings.database.path = v;
    }
    if let Some(v) = env.string("TASKY_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.bool("TASKY_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

// ── Variable readers (thin wrappers) ────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid integer env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::errors::SettingsError;
    use assert_matches::assert_matches;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"scheduler": {"enabled": true, "tickSeconds": 60}});
        let source = serde_json::json!({"scheduler": {"tickSeconds": 30}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["scheduler"]["tickSeconds"], 30);
        assert_eq!(merged["scheduler"]["enabled"], true);
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let merged = deep_merge(target, serde_json::json!({"a": null}));
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let merged = deep_merge(target, serde_json::json!({"items": [4]}));
        assert_eq!(merged["items"], serde_json::json!([4]));
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let merged = deep_merge(target, serde_json::json!({"a": 42}));
        assert_eq!(merged["a"], 42);
    }

    // ── file layers ─────────────────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let settings = load_file_layers(Path::new("/nonexistent/settings.json")).unwrap();
        assert!(settings.scheduler.enabled);
        assert_eq!(settings.scheduler.tick_seconds, 60);
        assert_eq!(settings.telegram.bot_token, None);
    }

    #[test]
    fn partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"telegram": {"botToken": "123:abc", "timeoutMs": 2500}, "scheduler": {"backupAt": "01:15"}}"#,
        )
        .unwrap();

        let settings = load_file_layers(&path).unwrap();
        assert_eq!(settings.telegram.token(), Some("123:abc"));
        assert_eq!(settings.telegram.timeout_ms, 2500);
        assert_eq!(settings.telegram.api_base_url, "https://api.telegram.org");
        assert_eq!(settings.scheduler.backup_at, "01:15");
        assert_eq!(settings.scheduler.retention_at, "03:00");
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();
        assert_matches!(load_file_layers(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn invalid_slot_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"scheduler": {"archiveAt": "99:99"}}"#).unwrap();
        assert_matches!(load_settings_from_path(&path), Err(SettingsError::InvalidValue(_)));
    }

    // ── overrides ───────────────────────────────────────────────────

    #[test]
    fn overrides_apply() {
        let mut settings = TaskySettings::default();
        apply_overrides_from(
            &mut settings,
            vars(&[
                ("TASKY_SCHEDULER_ENABLED", "off"),
                ("TASKY_TICK_SECONDS", "15"),
                ("TASKY_TELEGRAM_API", "http://localhost:8081"),
                ("TASKY_DB_PATH", "/data/tasky.db"),
                ("TASKY_LOG_LEVEL", "debug"),
                ("TASKY_LOG_JSON", "yes"),
            ]),
        );
        assert!(!settings.scheduler.enabled);
        assert_eq!(settings.scheduler.tick_seconds, 15);
        assert_eq!(settings.telegram.api_base_url, "http://localhost:8081");
        assert_eq!(settings.database.path, "/data/tasky.db");
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.json);
    }

    #[test]
    fn token_precedence() {
        let mut settings = TaskySettings::default();
        apply_overrides_from(&mut settings, vars(&[("TELEGRAM_BOT_TOKEN", "fallback")]));
        assert_eq!(settings.telegram.token(), Some("fallback"));

        apply_overrides_from(
            &mut settings,
            vars(&[("TELEGRAM_BOT_TOKEN", "fallback"), ("TASKY_BOT_TOKEN", "primary")]),
        );
        assert_eq!(settings.telegram.token(), Some("primary"));
    }

    #[test]
    fn invalid_values_ignored() {
        let mut settings = TaskySettings::default();
        apply_overrides_from(
            &mut settings,
            vars(&[
                ("TASKY_SCHEDULER_ENABLED", "maybe"),
                ("TASKY_TICK_SECONDS", "0"),
                ("TASKY_DB_PATH", "  "),
            ]),
        );
        assert!(settings.scheduler.enabled);
        assert_eq!(settings.scheduler.tick_seconds, 60);

        for raw in ["7", "120"] {
            apply_overrides_from(&mut settings, vars(&[("TASKY_TICK_SECONDS", raw)]));
            assert_eq!(settings.scheduler.tick_seconds, 60, "{raw}");
        }
        assert_eq!(settings.database.path, "tasky.db");
    }

    #[test]
    fn parse_helpers() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("nah"), None);
        assert_eq!(parse_u64_range("30", 1, 3600), Some(30));
        assert_eq!(parse_u64_range("3601", 1, 3600), None);
        assert_eq!(parse_u64_range("-1", 1, 3600), None);
    }
}
