use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tasky_core::UserId;
use tasky_core::task::{Priority, RecurrenceRule, RecurrenceType, Task, TaskPayload};
use tracing::debug;

use super::{format_ts, generate_id, parse_ts, parse_ts_or_epoch};
use crate::errors::{Result, StoreError};

/// Todo rows and their tag links.
pub struct TaskRepository;

impl TaskRepository {
    // ─────────────────────────────────────────────────────────────────────
    // CRUD
    // ─────────────────────────────────────────────────────────────────────

    /// Create a task for `user`.
    ///
    /// A payload carrying a `recurrence_parent_id` is one step of a series.
    /// If that step already exists (same parent and due date) the existing
    /// task is returned and nothing is inserted.
    pub fn create(conn: &Connection, user: UserId, payload: &TaskPayload) -> Result<Task> {
        let due = payload.due_date.map(format_ts);

        let tx = conn.unchecked_transaction()?;
        if let (Some(parent), Some(due)) = (&payload.recurrence_parent_id, &due) {
            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM todos WHERE recurrence_parent_id = ?1 AND due_date = ?2",
                    params![parent, due],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(id) = existing {
                debug!(task_id = %id, parent = %parent, "series step already exists");
                tx.commit()?;
                return Self::get(conn, &id)?.ok_or(StoreError::NotFound(id));
            }
        }

        let id = generate_id("todo");
        let now = format_ts(Utc::now());
        let rule = payload.recurrence_rule.as_ref();
        let days_json = rule
            .and_then(|r| r.days_of_week.as_ref())
            .map(serde_json::to_string)
            .transpose()?;

        let _ = tx.execute(
            "INSERT INTO todos (id, user_id, project_id, parent_id, text, description, priority,
             due_date, recurrence_type, recurrence_interval, recurrence_end_date,
             recurrence_days_of_week, recurrence_day_of_month, is_recurring,
             recurrence_parent_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)",
            params![
                id,
                user.get(),
                payload.project_id.as_deref().filter(|s| !s.is_empty()),
                payload.parent_id.as_deref().filter(|s| !s.is_empty()),
                payload.text,
                payload.description,
                payload.priority.as_sql(),
                due,
                rule.map(|r| r.kind.as_sql()),
                rule.map_or(1, RecurrenceRule::effective_interval),
                rule.and_then(|r| r.end_date).map(|d| d.format("%Y-%m-%d").to_string()),
                days_json,
                rule.and_then(|r| r.day_of_month),
                payload.is_recurring,
                payload.recurrence_parent_id,
                now,
            ],
        )?;

        for tag_id in &payload.tag_ids {
            // Only link tags the user owns
            let _ = tx.execute(
                "INSERT OR IGNORE INTO todo_tags (todo_id, tag_id)
                 SELECT ?1, id FROM tags WHERE id = ?2 AND user_id = ?3",
                params![id, tag_id, user.get()],
            )?;
        }
        tx.commit()?;

        Self::get(conn, &id)?.ok_or(StoreError::NotFound(id))
    }

    /// Get a task by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<Option<Task>> {
        let task = conn
            .query_row("SELECT * FROM todos WHERE id = ?1", params![id], |row| Ok(task_from_row(row)))
            .optional()?;
        match task {
            Some(mut task) => {
                task.tags = load_tags(conn, &task.id)?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    /// All tasks of a user, oldest first.
    pub fn list_for_user(conn: &Connection, user: UserId) -> Result<Vec<Task>> {
        query_tasks(
            conn,
            "SELECT * FROM todos WHERE user_id = ?1 ORDER BY created_at, id",
            params![user.get()],
        )
    }

    /// Set the completion flag. Completing stamps `completed_at`; reopening clears it.
    /// Returns `None` if the task does not exist.
    pub fn set_completed(conn: &Connection, id: &str, completed: bool, at: DateTime<Utc>) -> Result<Option<Task>> {
        let at = format_ts(at);
        let changed = conn.execute(
            "UPDATE todos SET completed = ?2,
               completed_at = CASE WHEN ?2 THEN COALESCE(completed_at, ?3) ELSE NULL END,
               updated_at = ?3
             WHERE id = ?1",
            params![id, completed, at],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        Self::get(conn, id)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Scheduling queries
    // ─────────────────────────────────────────────────────────────────────

    /// Incomplete tasks due in `[start, end_exclusive)`, earliest first.
    pub fn due_in_range(
        conn: &Connection,
        user: UserId,
        start: DateTime<Utc>,
        end_exclusive: DateTime<Utc>,
    ) -> Result<Vec<Task>> {
        query_tasks(
            conn,
            "SELECT * FROM todos
             WHERE user_id = ?1 AND completed = 0 AND due_date IS NOT NULL
               AND due_date >= ?2 AND due_date < ?3
             ORDER BY due_date, id",
            params![user.get(), format_ts(start), format_ts(end_exclusive)],
        )
    }

    /// Incomplete tasks due strictly before `before`, earliest first.
    pub fn overdue(conn: &Connection, user: UserId, before: DateTime<Utc>) -> Result<Vec<Task>> {
        query_tasks(
            conn,
            "SELECT * FROM todos
             WHERE user_id = ?1 AND completed = 0 AND due_date IS NOT NULL AND due_date < ?2
             ORDER BY due_date, id",
            params![user.get(), format_ts(before)],
        )
    }

    /// Delete completed tasks finished before `cutoff`.
    ///
    /// Finish time is `completed_at`, or `updated_at` for rows completed
    /// before that column was tracked. Returns the number of deleted rows.
    pub fn delete_completed_older_than(conn: &Connection, user: UserId, cutoff: DateTime<Utc>) -> Result<u64> {
        let deleted = conn.execute(
            "DELETE FROM todos
             WHERE user_id = ?1 AND completed = 1 AND COALESCE(completed_at, updated_at) < ?2",
            params![user.get(), format_ts(cutoff)],
        )?;
        Ok(deleted as u64)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row converters
// ─────────────────────────────────────────────────────────────────────────────

fn query_tasks(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(sql)?;
    let mut tasks = stmt
        .query_map(params, |row| Ok(task_from_row(row)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for task in &mut tasks {
        task.tags = load_tags(conn, &task.id)?;
    }
    Ok(tasks)
}

fn load_tags(conn: &Connection, task_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT tag_id FROM todo_tags WHERE todo_id = ?1 ORDER BY tag_id")?;
    let tags = stmt
        .query_map(params![task_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(tags)
}

fn rule_from_row(row: &rusqlite::Row<'_>) -> Option<RecurrenceRule> {
    let kind: Option<String> = row.get_unwrap("recurrence_type");
    let kind = RecurrenceType::from_sql(kind.as_deref()?)?;
    let interval: Option<i64> = row.get_unwrap("recurrence_interval");
    let end: Option<String> = row.get_unwrap("recurrence_end_date");
    let days: Option<String> = row.get_unwrap("recurrence_days_of_week");
    let day_of_month: Option<i64> = row.get_unwrap("recurrence_day_of_month");

    Some(RecurrenceRule {
        kind,
        interval: interval.and_then(|i| u32::try_from(i).ok()).unwrap_or(1),
        end_date: end.as_deref().and_then(parse_end_date),
        days_of_week: days.and_then(|json| serde_json::from_str(&json).ok()),
        day_of_month: day_of_month.and_then(|d| u8::try_from(d).ok()),
    })
}

fn parse_end_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_ts(value).map(|ts| ts.date_naive()))
}

fn task_from_row(row: &rusqlite::Row<'_>) -> Task {
    let priority: String = row.get_unwrap("priority");
    let due: Option<String> = row.get_unwrap("due_date");
    let created: String = row.get_unwrap("created_at");
    let updated: String = row.get_unwrap("updated_at");
    let completed_at: Option<String> = row.get_unwrap("completed_at");

    Task {
        id: row.get_unwrap("id"),
        user_id: UserId(row.get_unwrap("user_id")),
        text: row.get_unwrap("text"),
        description: row.get_unwrap("description"),
        completed: row.get_unwrap("completed"),
        priority: Priority::from_sql(&priority),
        due_date: due.as_deref().and_then(parse_ts),
        project_id: row.get_unwrap("project_id"),
        parent_id: row.get_unwrap("parent_id"),
        tags: Vec::new(),
        recurrence_rule: rule_from_row(row),
        is_recurring: row.get_unwrap("is_recurring"),
        recurrence_parent_id: row.get_unwrap("recurrence_parent_id"),
        created_at: parse_ts_or_epoch(&created),
        updated_at: parse_ts_or_epoch(&updated),
        completed_at: completed_at.as_deref().and_then(parse_ts),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::TagRepository;
    use crate::repositories::test_support::{add_user, setup_db};
    use chrono::{Duration, TimeZone};

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
    }

    fn payload(text: &str, due: Option<DateTime<Utc>>) -> TaskPayload {
        TaskPayload {
            text: text.into(),
            due_date: due,
            ..Default::default()
        }
    }

    #[test]
    fn create_minimal() {
        let conn = setup_db();
        let user = add_user(&conn, 1);
        let task = TaskRepository::create(&conn, user, &payload("Buy milk", None)).unwrap();
        assert!(task.id.starts_with("todo-"));
        assert_eq!(task.text, "Buy milk");
        assert_eq!(task.priority, Priority::None);
        assert!(!task.completed);
        assert!(task.recurrence_rule.is_none());
    }

    #[test]
    fn create_round_trips_recurrence_and_tags() {
        let conn = setup_db();
        let user = add_user(&conn, 1);
        let tag = TagRepository::create(&conn, user, "home", None).unwrap();
        let rule = RecurrenceRule::weekly(2)
            .on_days(vec![1, 3])
            .until(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        let task = TaskRepository::create(
            &conn,
            user,
            &TaskPayload {
                text: "Gym".into(),
                priority: Priority::High,
                due_date: Some(at(15, 18)),
                tag_ids: vec![tag.id.clone(), "tag-foreign".into()],
                recurrence_rule: Some(rule.clone()),
                is_recurring: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(task.recurrence_rule, Some(rule));
        assert!(task.is_recurring);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.due_date, Some(at(15, 18)));
        assert_eq!(task.tags, vec![tag.id]);
    }

    #[test]
    fn series_step_is_idempotent() {
        let conn = setup_db();
        let user = add_user(&conn, 1);
        let root = TaskRepository::create(&conn, user, &payload("Standup", Some(at(15, 9)))).unwrap();

        let step = TaskPayload {
            recurrence_parent_id: Some(root.id.clone()),
            ..payload("Standup", Some(at(16, 9)))
        };
        let first = TaskRepository::create(&conn, user, &step).unwrap();
        let second = TaskRepository::create(&conn, user, &step).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(TaskRepository::list_for_user(&conn, user).unwrap().len(), 2);
    }

    #[test]
    fn due_range_is_half_open_and_skips_completed() {
        let conn = setup_db();
        let user = add_user(&conn, 1);
        let other = add_user(&conn, 2);
        let start = at(15, 0);
        let end = at(16, 0);

        let inside = TaskRepository::create(&conn, user, &payload("inside", Some(at(15, 12)))).unwrap();
        let _ = TaskRepository::create(&conn, user, &payload("at start", Some(start))).unwrap();
        let _ = TaskRepository::create(&conn, user, &payload("at end", Some(end))).unwrap();
        let _ = TaskRepository::create(&conn, user, &payload("no due", None)).unwrap();
        let _ = TaskRepository::create(&conn, other, &payload("other user", Some(at(15, 12)))).unwrap();
        let done = TaskRepository::create(&conn, user, &payload("done", Some(at(15, 13)))).unwrap();
        let _ = TaskRepository::set_completed(&conn, &done.id, true, at(15, 14)).unwrap();

        let texts: Vec<_> = TaskRepository::due_in_range(&conn, user, start, end)
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(texts, ["at start", "inside"]);
        assert!(TaskRepository::get(&conn, &inside.id).unwrap().is_some());
    }

    #[test]
    fn overdue_is_strictly_before() {
        let conn = setup_db();
        let user = add_user(&conn, 1);
        let _ = TaskRepository::create(&conn, user, &payload("old", Some(at(10, 9)))).unwrap();
        let _ = TaskRepository::create(&conn, user, &payload("boundary", Some(at(15, 0)))).unwrap();

        let overdue = TaskRepository::overdue(&conn, user, at(15, 0)).unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].text, "old");
    }

    #[test]
    fn set_completed_stamps_and_clears() {
        let conn = setup_db();
        let user = add_user(&conn, 1);
        let task = TaskRepository::create(&conn, user, &payload("x", None)).unwrap();

        let done = TaskRepository::set_completed(&conn, &task.id, true, at(15, 10)).unwrap().unwrap();
        assert!(done.completed);
        assert_eq!(done.completed_at, Some(at(15, 10)));

        let reopened = TaskRepository::set_completed(&conn, &task.id, false, at(15, 11)).unwrap().unwrap();
        assert!(!reopened.completed);
        assert_eq!(reopened.completed_at, None);

        assert!(TaskRepository::set_completed(&conn, "todo-missing", true, at(15, 10)).unwrap().is_none());
    }

    #[test]
    fn cleanup_uses_completion_time() {
        let conn = setup_db();
        let user = add_user(&conn, 1);
        let old = TaskRepository::create(&conn, user, &payload("old", None)).unwrap();
        let recent = TaskRepository::create(&conn, user, &payload("recent", None)).unwrap();
        let open = TaskRepository::create(&conn, user, &payload("open", None)).unwrap();
        let _ = TaskRepository::set_completed(&conn, &old.id, true, at(1, 0)).unwrap();
        let _ = TaskRepository::set_completed(&conn, &recent.id, true, at(20, 0)).unwrap();

        let deleted = TaskRepository::delete_completed_older_than(&conn, user, at(10, 0)).unwrap();
        assert_eq!(deleted, 1);
        assert!(TaskRepository::get(&conn, &old.id).unwrap().is_none());
        assert!(TaskRepository::get(&conn, &recent.id).unwrap().is_some());
        assert!(TaskRepository::get(&conn, &open.id).unwrap().is_some());
    }

    #[test]
    fn cleanup_falls_back_to_updated_at() {
        let conn = setup_db();
        let user = add_user(&conn, 1);
        let task = TaskRepository::create(&conn, user, &payload("legacy", None)).unwrap();
        let _ = conn.execute(
            "UPDATE todos SET completed = 1, completed_at = NULL, updated_at = ?2 WHERE id = ?1",
            params![task.id, format_ts(at(1, 0))],
        )
        .unwrap();

        let cutoff = at(1, 0) + Duration::days(1);
        assert_eq!(TaskRepository::delete_completed_older_than(&conn, user, cutoff).unwrap(), 1);
    }

    #[test]
    fn deleting_series_root_keeps_instances() {
        let conn = setup_db();
        let user = add_user(&conn, 1);
        let root = TaskRepository::create(&conn, user, &payload("root", Some(at(1, 9)))).unwrap();
        let next = TaskRepository::create(
            &conn,
            user,
            &TaskPayload {
                recurrence_parent_id: Some(root.id.clone()),
                ..payload("root", Some(at(2, 9)))
            },
        )
        .unwrap();
        let _ = TaskRepository::set_completed(&conn, &root.id, true, at(1, 10)).unwrap();
        let _ = TaskRepository::delete_completed_older_than(&conn, user, at(5, 0)).unwrap();

        let survivor = TaskRepository::get(&conn, &next.id).unwrap().unwrap();
        assert_eq!(survivor.recurrence_parent_id, None);
    }
}
