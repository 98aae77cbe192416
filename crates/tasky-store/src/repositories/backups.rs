use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Value, json};
use tasky_core::UserId;
use tasky_core::traits::BackupSummary;
use tracing::info;

use super::{ProjectRepository, SettingsRepository, TagRepository, TaskRepository, format_ts, generate_id, parse_ts_or_epoch};
use crate::errors::Result;
use crate::types::BackupRecord;

const BACKUP_FORMAT_VERSION: &str = "1.0";

/// JSON snapshots of a user's data.
pub struct BackupRepository;

impl BackupRepository {
    /// Snapshot every task, project and tag of `user` and record `at` as the
    /// user's last backup date. Both writes commit together.
    pub fn create(conn: &Connection, user: UserId, at: DateTime<Utc>) -> Result<BackupSummary> {
        let tx = conn.unchecked_transaction()?;

        let todos = TaskRepository::list_for_user(&tx, user)?;
        let projects = ProjectRepository::list_for_user(&tx, user)?;
        let tags = TagRepository::list_for_user(&tx, user)?;

        let payload = json!({
            "version": BACKUP_FORMAT_VERSION,
            "exportedAt": format_ts(at),
            "userId": user,
            "todos": todos,
            "projects": projects,
            "tags": tags,
        });

        let id = generate_id("backup");
        let _ = tx.execute(
            "INSERT INTO backups (id, user_id, created_at, task_count, payload) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, user.get(), format_ts(at), todos.len() as i64, payload.to_string()],
        )?;
        SettingsRepository::record_backup_date(&tx, user, at)?;
        tx.commit()?;

        info!(user = %user, backup_id = %id, tasks = todos.len(), "backup created");
        Ok(BackupSummary {
            id,
            user_id: user,
            created_at: at,
            task_count: todos.len(),
            project_count: projects.len(),
            tag_count: tags.len(),
        })
    }

    /// Backups of `user`, newest first.
    pub fn list(conn: &Connection, user: UserId) -> Result<Vec<BackupRecord>> {
        let mut stmt = conn.prepare(
            "SELECT id, user_id, created_at, task_count FROM backups
             WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;
        let records = stmt
            .query_map(params![user.get()], |row| {
                let created: String = row.get_unwrap("created_at");
                let count: i64 = row.get_unwrap("task_count");
                Ok(BackupRecord {
                    id: row.get_unwrap("id"),
                    user_id: UserId(row.get_unwrap("user_id")),
                    created_at: parse_ts_or_epoch(&created),
                    task_count: usize::try_from(count).unwrap_or(0),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Stored JSON snapshot of a backup.
    pub fn payload(conn: &Connection, id: &str) -> Result<Option<Value>> {
        let raw: Option<String> = conn
            .query_row("SELECT payload FROM backups WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        raw.map(|text| serde_json::from_str(&text)).transpose().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::{add_user, setup_db};
    use chrono::TimeZone;
    use tasky_core::task::TaskPayload;

    #[test]
    fn snapshot_contains_user_data_only() {
        let conn = setup_db();
        let user = add_user(&conn, 1);
        let other = add_user(&conn, 2);
        let _ = ProjectRepository::create(&conn, user, "Home", None).unwrap();
        let _ = TagRepository::create(&conn, user, "urgent", Some("#ff0000")).unwrap();
        for text in ["a", "b"] {
            let _ = TaskRepository::create(&conn, user, &TaskPayload { text: text.into(), ..Default::default() }).unwrap();
        }
        let _ = TaskRepository::create(&conn, other, &TaskPayload { text: "c".into(), ..Default::default() }).unwrap();

        let at = Utc.with_ymd_and_hms(2024, 2, 1, 2, 0, 0).unwrap();
        let summary = BackupRepository::create(&conn, user, at).unwrap();
        assert_eq!(summary.task_count, 2);
        assert_eq!(summary.project_count, 1);
        assert_eq!(summary.tag_count, 1);

        let payload = BackupRepository::payload(&conn, &summary.id).unwrap().unwrap();
        assert_eq!(payload["version"], "1.0");
        assert_eq!(payload["exportedAt"], "2024-02-01T02:00:00Z");
        assert_eq!(payload["userId"], 1);
        assert_eq!(payload["todos"].as_array().unwrap().len(), 2);
        assert_eq!(payload["tags"][0]["color"], "#ff0000");
    }

    #[test]
    fn backup_updates_last_backup_date() {
        let conn = setup_db();
        let user = add_user(&conn, 1);
        let at = Utc.with_ymd_and_hms(2024, 2, 1, 2, 0, 0).unwrap();
        let _ = BackupRepository::create(&conn, user, at).unwrap();

        let settings = SettingsRepository::get(&conn, user).unwrap().unwrap();
        assert_eq!(settings.last_backup_date, Some(at));
    }

    #[test]
    fn list_newest_first() {
        let conn = setup_db();
        let user = add_user(&conn, 1);
        let first = Utc.with_ymd_and_hms(2024, 2, 1, 2, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 2, 8, 2, 0, 0).unwrap();
        let _ = BackupRepository::create(&conn, user, first).unwrap();
        let _ = BackupRepository::create(&conn, user, second).unwrap();

        let records = BackupRepository::list(&conn, user).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].created_at, second);
        assert_eq!(records[1].created_at, first);
    }

    #[test]
    fn missing_payload() {
        let conn = setup_db();
        assert!(BackupRepository::payload(&conn, "backup-missing").unwrap().is_none());
    }
}
