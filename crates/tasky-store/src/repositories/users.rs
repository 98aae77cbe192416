use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tasky_core::UserId;

use super::{format_ts, parse_ts_or_epoch};
use crate::errors::{Result, StoreError};
use crate::types::{User, UserProfile};

/// User rows, created or refreshed on every sign-in.
pub struct UserRepository;

impl UserRepository {
    /// Insert the user or refresh their profile fields.
    pub fn upsert(conn: &Connection, profile: &UserProfile) -> Result<User> {
        let now = format_ts(Utc::now());
        let _ = conn.execute(
            "INSERT INTO users (id, first_name, last_name, username, language_code, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(id) DO UPDATE SET
               first_name = excluded.first_name,
               last_name = excluded.last_name,
               username = excluded.username,
               language_code = excluded.language_code,
               updated_at = excluded.updated_at",
            params![
                profile.id,
                profile.first_name,
                profile.last_name,
                profile.username,
                profile.language_code,
                now,
            ],
        )?;
        Self::get(conn, UserId(profile.id))?.ok_or_else(|| StoreError::NotFound(format!("user {}", profile.id)))
    }

    /// Get a user by ID.
    pub fn get(conn: &Connection, id: UserId) -> Result<Option<User>> {
        let user = conn
            .query_row("SELECT * FROM users WHERE id = ?1", params![id.get()], |row| {
                Ok(user_from_row(row))
            })
            .optional()?;
        Ok(user)
    }

    /// All user IDs in ascending order.
    pub fn list_ids(conn: &Connection) -> Result<Vec<UserId>> {
        let mut stmt = conn.prepare("SELECT id FROM users ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids.into_iter().map(UserId).collect())
    }
}

fn user_from_row(row: &rusqlite::Row<'_>) -> User {
    let created: String = row.get_unwrap("created_at");
    let updated: String = row.get_unwrap("updated_at");
    User {
        id: UserId(row.get_unwrap("id")),
        first_name: row.get_unwrap("first_name"),
        last_name: row.get_unwrap("last_name"),
        username: row.get_unwrap("username"),
        language_code: row.get_unwrap("language_code"),
        created_at: parse_ts_or_epoch(&created),
        updated_at: parse_ts_or_epoch(&updated),
    }
}
