//! Async facade over the repositories.
//!
//! [`SqliteStore`] owns the connection pool and runs each repository call on
//! the blocking thread pool, so the scheduler never blocks its runtime on
//! `SQLite` I/O.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tasky_core::settings::UserScheduleSettings;
use tasky_core::task::{Task, TaskPayload};
use tasky_core::traits::{BackupSummary, ScheduleStore, TaskCreator};
use tasky_core::UserId;
use tracing::{debug, info};

use crate::connection::{self, ConnectionConfig, ConnectionPool, PooledConnection};
use crate::errors::Result;
use crate::migrations::run_migrations;
use crate::repositories::{BackupRepository, SettingsRepository, TaskRepository};

/// `SQLite`-backed implementation of the scheduler's storage traits.
#[derive(Clone)]
pub struct SqliteStore {
    pool: ConnectionPool,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply pending migrations.
    pub fn open(path: &Path, config: &ConnectionConfig) -> Result<Self> {
        let pool = connection::new_file(path, config)?;
        let applied = run_migrations(&*pool.get()?)?;
        info!(path = %path.display(), applied, "database ready");
        Ok(Self { pool })
    }

    /// A migrated in-memory database.
    pub fn in_memory() -> Result<Self> {
        let pool = connection::new_in_memory()?;
        let _ = run_migrations(&*pool.get()?)?;
        Ok(Self { pool })
    }

    /// The underlying pool, for callers that use the repositories directly.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Run `f` with a pooled connection on the blocking thread pool.
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&PooledConnection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await?
    }
}

#[async_trait]
impl ScheduleStore for SqliteStore {
    async fn query_tasks_due_in_range(
        &self,
        user: UserId,
        start: DateTime<Utc>,
        end_exclusive: DateTime<Utc>,
    ) -> tasky_core::Result<Vec<Task>> {
        let tasks = self
            .run(move |conn| TaskRepository::due_in_range(conn, user, start, end_exclusive))
            .await?;
        Ok(tasks)
    }

    async fn query_overdue_tasks(&self, user: UserId, before: DateTime<Utc>) -> tasky_core::Result<Vec<Task>> {
        let tasks = self.run(move |conn| TaskRepository::overdue(conn, user, before)).await?;
        Ok(tasks)
    }

    async fn query_user_schedule_settings(&self) -> tasky_core::Result<Vec<UserScheduleSettings>> {
        let settings = self.run(|conn| SettingsRepository::list_schedule_settings(conn)).await?;
        Ok(settings)
    }

    async fn delete_completed_older_than(&self, user: UserId, cutoff: DateTime<Utc>) -> tasky_core::Result<u64> {
        let deleted = self
            .run(move |conn| TaskRepository::delete_completed_older_than(conn, user, cutoff))
            .await?;
        if deleted > 0 {
            debug!(user = %user, deleted, "completed tasks removed");
        }
        Ok(deleted)
    }

    async fn create_backup(&self, user: UserId, at: DateTime<Utc>) -> tasky_core::Result<BackupSummary> {
        let summary = self.run(move |conn| BackupRepository::create(conn, user, at)).await?;
        Ok(summary)
    }
}

#[async_trait]
impl TaskCreator for SqliteStore {
    async fn create_task(&self, user: UserId, payload: TaskPayload) -> tasky_core::Result<Task> {
        let task = self.run(move |conn| TaskRepository::create(conn, user, &payload)).await?;
        Ok(task)
    }
}
