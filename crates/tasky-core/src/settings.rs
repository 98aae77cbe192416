//! Per-user scheduling preferences.
//!
//! One [`UserScheduleSettings`] row exists per user. The scheduler only ever
//! reads them; writes happen through the store when the user edits settings.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::UserId;
use crate::notification::NotificationClass;

// ─────────────────────────────────────────────────────────────────────────────
// Enums
// ─────────────────────────────────────────────────────────────────────────────

/// How often automatic backups are taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupFrequency {
    /// No automatic backups.
    #[default]
    Never,
    /// Once a day.
    Daily,
    /// Once every 7 days.
    Weekly,
    /// Once every 30 days.
    Monthly,
}

impl BackupFrequency {
    /// Minimum time between two backups, `None` for [`BackupFrequency::Never`].
    #[must_use]
    pub fn period(self) -> Option<Duration> {
        match self {
            Self::Never => None,
            Self::Daily => Some(Duration::days(1)),
            Self::Weekly => Some(Duration::days(7)),
            Self::Monthly => Some(Duration::days(30)),
        }
    }

    /// SQL string representation.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Parse the SQL representation. Unknown values map to [`BackupFrequency::Never`].
    #[must_use]
    pub fn from_sql(value: &str) -> Self {
        match value {
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "monthly" => Self::Monthly,
            _ => Self::Never,
        }
    }
}

/// Message language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// English.
    #[default]
    En,
    /// Russian.
    Ru,
}

impl Locale {
    /// Map a language code (`"ru"`, `"ru-RU"`, `"en"`) to a supported locale.
    /// Anything unrecognized is English.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        let primary = code.split(['-', '_']).next().unwrap_or_default();
        if primary.eq_ignore_ascii_case("ru") {
            Self::Ru
        } else {
            Self::En
        }
    }

    /// Language code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ru => "ru",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// UserScheduleSettings
// ─────────────────────────────────────────────────────────────────────────────

/// Default daily notification time.
pub const DEFAULT_NOTIFICATION_TIME: &str = "09:00";
/// Default archive horizon for completed tasks.
pub const DEFAULT_ARCHIVE_AFTER_DAYS: u32 = 30;

/// Scheduling preferences for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserScheduleSettings {
    /// Owner.
    pub user_id: UserId,
    /// Master switch for all notifications.
    pub notifications_enabled: bool,
    /// Send the daily summary.
    pub daily_notifications: bool,
    /// Local time of day (`HH:mm`) at which all notification classes fire.
    pub daily_notification_time: String,
    /// IANA timezone name.
    pub timezone: String,
    /// Day offsets to remind about ahead of the due date.
    pub reminder_days_before: BTreeSet<u32>,
    /// Send the overdue list.
    pub notify_on_overdue: bool,
    /// Start of the quiet window (`HH:mm`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet_hours_start: Option<String>,
    /// End of the quiet window (`HH:mm`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet_hours_end: Option<String>,
    /// Delete completed tasks after `archive_after_days`.
    pub auto_archive_completed: bool,
    /// Archive horizon in days.
    pub archive_after_days: u32,
    /// Automatic backup cadence.
    pub backup_frequency: BackupFrequency,
    /// When the last backup was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_backup_date: Option<DateTime<Utc>>,
    /// Delete completed tasks older than this many days. `None` keeps them forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_retention_days: Option<u32>,
    /// Language code for messages.
    pub language: String,
}

impl UserScheduleSettings {
    /// Settings a user gets before they ever change anything.
    #[must_use]
    pub fn defaults_for(user_id: UserId) -> Self {
        Self {
            user_id,
            notifications_enabled: true,
            daily_notifications: true,
            daily_notification_time: DEFAULT_NOTIFICATION_TIME.to_string(),
            timezone: "UTC".to_string(),
            reminder_days_before: BTreeSet::from([1]),
            notify_on_overdue: true,
            quiet_hours_start: None,
            quiet_hours_end: None,
            auto_archive_completed: false,
            archive_after_days: DEFAULT_ARCHIVE_AFTER_DAYS,
            backup_frequency: BackupFrequency::Never,
            last_backup_date: None,
            data_retention_days: None,
            language: "en".to_string(),
        }
    }

    /// Whether the master switch and the class flag both allow `class`.
    #[must_use]
    pub fn class_enabled(&self, class: NotificationClass) -> bool {
        if !self.notifications_enabled {
            return false;
        }
        match class {
            NotificationClass::DailySummary => self.daily_notifications,
            NotificationClass::Reminder => !self.reminder_days_before.is_empty(),
            NotificationClass::Overdue => self.notify_on_overdue,
        }
    }

    /// Message locale derived from [`Self::language`].
    #[must_use]
    pub fn locale(&self) -> Locale {
        Locale::from_code(&self.language)
    }

    /// Whether an automatic backup is due at `now`.
    #[must_use]
    pub fn backup_due(&self, now: DateTime<Utc>) -> bool {
        let Some(period) = self.backup_frequency.period() else {
            return false;
        };
        match self.last_backup_date {
            None => true,
            Some(last) => now - last >= period,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
