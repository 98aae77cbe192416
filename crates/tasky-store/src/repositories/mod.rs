//! Stateless repositories.
//!
//! Every method takes a `&Connection` and translates between Rust types and
//! SQL. IDs are prefixed UUID v7 strings; timestamps are UTC text in a single
//! fixed format so that range predicates can compare them directly.

mod backups;
mod catalog;
mod settings;
mod tasks;
mod users;

pub use backups::BackupRepository;
pub use catalog::{ProjectRepository, TagRepository};
pub use settings::SettingsRepository;
pub use tasks::TaskRepository;
pub use users::UserRepository;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Generate a prefixed UUID v7 ID.
pub(crate) fn generate_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::now_v7())
}

/// Format a UTC instant for storage.
pub(crate) fn format_ts(at: DateTime<Utc>) -> String {
    at.format(TS_FORMAT).to_string()
}

/// Parse a stored timestamp.
///
/// Accepts the storage format, any RFC 3339 value, `SQLite`'s
/// `datetime('now')` output, and bare dates (taken as UTC midnight).
pub(crate) fn parse_ts(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_ts_or_epoch(value: &str) -> DateTime<Utc> {
    parse_ts(value).unwrap_or_default()
}
