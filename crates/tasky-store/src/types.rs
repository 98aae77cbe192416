//! Row types owned by the store.
//!
//! Tasks and settings use the shared `tasky-core` types; these cover the
//! remaining tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tasky_core::UserId;

/// A Telegram user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Telegram user id.
    pub id: UserId,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: Option<String>,
    /// Telegram username.
    pub username: Option<String>,
    /// Client language code.
    pub language_code: Option<String>,
    /// First seen.
    pub created_at: DateTime<Utc>,
    /// Last profile update.
    pub updated_at: DateTime<Utc>,
}

/// Fields taken from Telegram auth data when a user signs in.
#[derive(Clone, Debug, Default)]
pub struct UserProfile {
    /// Telegram user id.
    pub id: i64,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: Option<String>,
    /// Telegram username.
    pub username: Option<String>,
    /// Client language code.
    pub language_code: Option<String>,
}

/// A project grouping tasks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Project ID (`project-<uuid>`).
    pub id: String,
    /// Owner.
    pub user_id: UserId,
    /// Display name, unique per user.
    pub name: String,
    /// Hex color.
    pub color: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A label attachable to tasks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Tag ID (`tag-<uuid>`).
    pub id: String,
    /// Owner.
    pub user_id: UserId,
    /// Display name, unique per user.
    pub name: String,
    /// Hex color.
    pub color: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Metadata of a stored backup snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    /// Backup ID (`backup-<uuid>`).
    pub id: String,
    /// Owner.
    pub user_id: UserId,
    /// Snapshot time.
    pub created_at: DateTime<Utc>,
    /// Number of tasks captured.
    pub task_count: usize,
}
