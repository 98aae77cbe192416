use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tasky_core::UserId;
use tasky_core::settings::{BackupFrequency, UserScheduleSettings};
use tracing::warn;

use super::{format_ts, parse_ts};
use crate::errors::{Result, StoreError};

/// Settings projection with column defaults applied for users without a row.
const SELECT_SETTINGS: &str = "SELECT u.id AS user_id,
       COALESCE(s.notifications_enabled, 1)         AS notifications_enabled,
       COALESCE(s.daily_notifications, 1)           AS daily_notifications,
       COALESCE(s.daily_notification_time, '09:00') AS daily_notification_time,
       COALESCE(s.timezone, 'UTC')                  AS timezone,
       COALESCE(s.reminder_days_before, '[1]')      AS reminder_days_before,
       COALESCE(s.notify_on_overdue, 1)             AS notify_on_overdue,
       s.quiet_hours_start                          AS quiet_hours_start,
       s.quiet_hours_end                            AS quiet_hours_end,
       COALESCE(s.auto_archive_completed, 0)        AS auto_archive_completed,
       COALESCE(s.archive_after_days, 30)           AS archive_after_days,
       COALESCE(s.backup_frequency, 'never')        AS backup_frequency,
       s.last_backup_date                           AS last_backup_date,
       s.data_retention_days                        AS data_retention_days,
       COALESCE(s.language, 'en')                   AS language
  FROM users u
  LEFT JOIN user_settings s ON s.user_id = u.id";

/// Per-user scheduling preferences.
pub struct SettingsRepository;

impl SettingsRepository {
    /// Settings of `user`, inserting the default row on first access.
    pub fn get_or_create(conn: &Connection, user: UserId) -> Result<UserScheduleSettings> {
        let now = format_ts(Utc::now());
        let _ = conn.execute(
            "INSERT OR IGNORE INTO user_settings (user_id, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![user.get(), now],
        )?;
        Self::get(conn, user)?.ok_or_else(|| StoreError::NotFound(format!("user {user}")))
    }

    /// Settings of `user` with defaults applied. `None` if the user is unknown.
    pub fn get(conn: &Connection, user: UserId) -> Result<Option<UserScheduleSettings>> {
        let sql = format!("{SELECT_SETTINGS} WHERE u.id = ?1");
        let settings = conn
            .query_row(&sql, params![user.get()], |row| Ok(settings_from_row(row)))
            .optional()?;
        Ok(settings)
    }

    /// Overwrite every stored field with the values in `settings`.
    pub fn update(conn: &Connection, settings: &UserScheduleSettings) -> Result<UserScheduleSettings> {
        let user = settings.user_id;
        let _ = Self::get_or_create(conn, user)?;
        let reminder_days = serde_json::to_string(&settings.reminder_days_before)?;
        let _ = conn.execute(
            "UPDATE user_settings SET
               notifications_enabled = ?2,
               daily_notifications = ?3,
               daily_notification_time = ?4,
               timezone = ?5,
               reminder_days_before = ?6,
               notify_on_overdue = ?7,
               quiet_hours_start = ?8,
               quiet_hours_end = ?9,
               auto_archive_completed = ?10,
               archive_after_days = ?11,
               backup_frequency = ?12,
               data_retention_days = ?13,
               language = ?14,
               updated_at = ?15
             WHERE user_id = ?1",
            params![
                user.get(),
                settings.notifications_enabled,
                settings.daily_notifications,
                settings.daily_notification_time,
                settings.timezone,
                reminder_days,
                settings.notify_on_overdue,
                settings.quiet_hours_start,
                settings.quiet_hours_end,
                settings.auto_archive_completed,
                settings.archive_after_days,
                settings.backup_frequency.as_sql(),
                settings.data_retention_days,
                settings.language,
                format_ts(Utc::now()),
            ],
        )?;
        Self::get(conn, user)?.ok_or_else(|| StoreError::NotFound(format!("user {user}")))
    }

    /// Settings of every user, in user-id order. Users who never saved
    /// settings get the column defaults.
    pub fn list_schedule_settings(conn: &Connection) -> Result<Vec<UserScheduleSettings>> {
        let sql = format!("{SELECT_SETTINGS} ORDER BY u.id");
        let mut stmt = conn.prepare(&sql)?;
        let settings = stmt
            .query_map([], |row| Ok(settings_from_row(row)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(settings)
    }

    /// Record when the last backup of `user` was taken.
    pub fn record_backup_date(conn: &Connection, user: UserId, at: DateTime<Utc>) -> Result<()> {
        let _ = Self::get_or_create(conn, user)?;
        let _ = conn.execute(
            "UPDATE user_settings SET last_backup_date = ?2, updated_at = ?2 WHERE user_id = ?1",
            params![user.get(), format_ts(at)],
        )?;
        Ok(())
    }
}

fn parse_reminder_days(user: UserId, raw: &str) -> BTreeSet<u32> {
    match serde_json::from_str::<Vec<i64>>(raw) {
        Ok(days) => days
            .into_iter()
            .filter(|d| *d > 0)
            .filter_map(|d| u32::try_from(d).ok())
            .collect(),
        Err(err) => {
            warn!(user = %user, value = raw, error = %err, "invalid reminder_days_before, using default");
            BTreeSet::from([1])
        }
    }
}

fn settings_from_row(row: &rusqlite::Row<'_>) -> UserScheduleSettings {
    let user_id = UserId(row.get_unwrap("user_id"));
    let reminder_days: String = row.get_unwrap("reminder_days_before");
    let backup_frequency: String = row.get_unwrap("backup_frequency");
    let last_backup: Option<String> = row.get_unwrap("last_backup_date");
    let archive_after_days: i64 = row.get_unwrap("archive_after_days");
    let retention: Option<i64> = row.get_unwrap("data_retention_days");

    UserScheduleSettings {
        user_id,
        notifications_enabled: row.get_unwrap("notifications_enabled"),
        daily_notifications: row.get_unwrap("daily_notifications"),
        daily_notification_time: row.get_unwrap("daily_notification_time"),
        timezone: row.get_unwrap("timezone"),
        reminder_days_before: parse_reminder_days(user_id, &reminder_days),
        notify_on_overdue: row.get_unwrap("notify_on_overdue"),
        quiet_hours_start: row.get_unwrap("quiet_hours_start"),
        quiet_hours_end: row.get_unwrap("quiet_hours_end"),
        auto_archive_completed: row.get_unwrap("auto_archive_completed"),
        archive_after_days: u32::try_from(archive_after_days).unwrap_or(0),
        backup_frequency: BackupFrequency::from_sql(&backup_frequency),
        last_backup_date: last_backup.as_deref().and_then(parse_ts),
        data_retention_days: retention.and_then(|d| u32::try_from(d).ok()),
        language: row.get_unwrap("language"),
    }
}
