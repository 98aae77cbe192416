//! Collaborator traits at the scheduler's boundary.
//!
//! The engine and instantiator only talk to the outside world through these
//! three traits. `tasky-store` and `tasky-notify` provide the production
//! implementations; tests substitute in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::ids::UserId;
use crate::settings::UserScheduleSettings;
use crate::task::{Task, TaskPayload};

// ─────────────────────────────────────────────────────────────────────────────
// Value types
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of a single notification delivery attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    /// Whether the message was accepted.
    pub success: bool,
    /// HTTP status code, when a response was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendResult {
    /// A successful delivery.
    #[must_use]
    pub fn ok(status_code: u16) -> Self {
        Self {
            success: true,
            status_code: Some(status_code),
            error: None,
        }
    }

    /// A failed delivery.
    #[must_use]
    pub fn failed(status_code: Option<u16>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code,
            error: Some(error.into()),
        }
    }
}

/// Summary of a backup snapshot written by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSummary {
    /// Backup row ID (`backup-<uuid>`).
    pub id: String,
    /// Owner.
    pub user_id: UserId,
    /// Snapshot time.
    pub created_at: DateTime<Utc>,
    /// Number of tasks in the snapshot.
    pub task_count: usize,
    /// Number of projects in the snapshot.
    pub project_count: usize,
    /// Number of tags in the snapshot.
    pub tag_count: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Traits
// ─────────────────────────────────────────────────────────────────────────────

/// Read and housekeeping access to task storage.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Incomplete tasks of `user` due in `[start, end_exclusive)`.
    async fn query_tasks_due_in_range(
        &self,
        user: UserId,
        start: DateTime<Utc>,
        end_exclusive: DateTime<Utc>,
    ) -> Result<Vec<Task>>;

    /// Incomplete tasks of `user` due strictly before `before`.
    async fn query_overdue_tasks(&self, user: UserId, before: DateTime<Utc>) -> Result<Vec<Task>>;

    /// Scheduling settings of every known user, with defaults for users
    /// who never saved any.
    async fn query_user_schedule_settings(&self) -> Result<Vec<UserScheduleSettings>>;

    /// Delete completed tasks of `user` finished before `cutoff`. Returns the
    /// number of deleted tasks.
    async fn delete_completed_older_than(&self, user: UserId, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Snapshot all of `user`'s data and record `at` as the last backup date.
    async fn create_backup(&self, user: UserId, at: DateTime<Utc>) -> Result<BackupSummary>;
}

/// Creates tasks on behalf of a user.
#[async_trait]
pub trait TaskCreator: Send + Sync {
    /// Persist a new task built from `payload`.
    async fn create_task(&self, user: UserId, payload: TaskPayload) -> Result<Task>;
}

/// Delivers a text message to a user.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `text` to `user`. Delivery failures are reported in the result,
    /// not as an error.
    async fn send(&self, user: UserId, text: &str) -> SendResult;
}
