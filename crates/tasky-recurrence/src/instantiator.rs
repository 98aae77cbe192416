//! Recurring task instantiation.
//!
//! When the current task of a series is past due and still open, the next
//! task is created as a new row. The original task is never touched.
//! Callers must not run two instantiations for the same task concurrently;
//! the store deduplicates on `(recurrence_parent_id, due_date)` as a backstop.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use metrics::counter;
use tasky_core::Result;
use tasky_core::task::{Task, TaskPayload};
use tasky_core::traits::TaskCreator;
use tracing::{debug, info, warn};

use crate::calculator::compute_next_occurrence_in;

/// Outcome counts of [`RecurringTaskInstantiator::process_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessReport {
    /// Tasks that met the preconditions.
    pub eligible: usize,
    /// New tasks created.
    pub generated: usize,
    /// Series that ended because the next occurrence is past the end date.
    pub terminated: usize,
    /// Creation attempts that failed.
    pub failed: usize,
}

/// Creates the next task of a recurring series through a [`TaskCreator`].
pub struct RecurringTaskInstantiator {
    creator: Arc<dyn TaskCreator>,
    tz: Tz,
}

impl RecurringTaskInstantiator {
    /// Instantiator doing calendar arithmetic in UTC.
    pub fn new(creator: Arc<dyn TaskCreator>) -> Self {
        Self { creator, tz: Tz::UTC }
    }

    /// Builder: do calendar arithmetic in `tz` (the owner's timezone).
    #[must_use]
    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    /// Whether `task` should spawn its next occurrence at `now`.
    pub fn is_eligible(task: &Task, now: DateTime<Utc>) -> bool {
        task.is_recurring
            && task.recurrence_rule.is_some()
            && !task.completed
            && task.due_date.is_some_and(|due| due < now)
    }

    /// Payload for the next task of the series, or `None` when the task is
    /// not eligible or the series has ended.
    pub fn next_payload(&self, task: &Task, now: DateTime<Utc>) -> Option<TaskPayload> {
        if !Self::is_eligible(task, now) {
            return None;
        }
        let rule = task.recurrence_rule.as_ref()?;
        let due = task.due_date?;
        let next = compute_next_occurrence_in(due, rule, self.tz);

        if let Some(end) = rule.end_date
            && next.with_timezone(&self.tz).date_naive() > end
        {
            return None;
        }

        Some(TaskPayload {
            text: task.text.clone(),
            description: task.description.clone(),
            priority: task.priority,
            project_id: task.project_id.clone(),
            parent_id: task.parent_id.clone(),
            due_date: Some(next),
            tag_ids: task.tags.clone(),
            recurrence_rule: Some(rule.clone()),
            is_recurring: true,
            recurrence_parent_id: Some(task.id.clone()),
        })
    }

    /// Create the next task of `task`'s series if it is due for one.
    ///
    /// Returns `Ok(None)` when preconditions fail or the series has ended;
    /// the creator is not called in either case.
    pub async fn maybe_generate_next(&self, task: &Task, now: DateTime<Utc>) -> Result<Option<Task>> {
        let Some(payload) = self.next_payload(task, now) else {
            debug!(task_id = %task.id, "no next occurrence to create");
            return Ok(None);
        };
        let created = self.creator.create_task(task.user_id, payload).await?;
        counter!("recurring_instances_created_total").increment(1);
        info!(
            task_id = %task.id,
            new_task_id = %created.id,
            user_id = %task.user_id,
            due = ?created.due_date,
            "created next recurring task"
        );
        Ok(Some(created))
    }

    /// Run [`Self::maybe_generate_next`] over every eligible task in order.
    ///
    /// Individual failures are logged and counted; they never stop the batch.
    pub async fn process_all(&self, tasks: &[Task], now: DateTime<Utc>) -> ProcessReport {
        let mut report = ProcessReport::default();
        for task in tasks.iter().filter(|t| Self::is_eligible(t, now)) {
            report.eligible += 1;
            match self.maybe_generate_next(task, now).await {
                Ok(Some(_)) => report.generated += 1,
                Ok(None) => report.terminated += 1,
                Err(e) => {
                    report.failed += 1;
                    counter!("recurring_instances_failed_total").increment(1);
                    warn!(task_id = %task.id, user_id = %task.user_id, error = %e, "failed to create next recurring task");
                }
            }
        }
        report
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, TimeZone};
    use parking_lot::Mutex;
    use tasky_core::UserId;
    use tasky_core::errors::CoreError;
    use tasky_core::task::{Priority, RecurrenceRule};

    /// Records payloads and echoes them back as tasks.
    #[derive(Default)]
    struct RecordingCreator {
        calls: Mutex<Vec<(UserId, TaskPayload)>>,
        fail_text: Option<String>,
    }

    #[async_trait]
    impl TaskCreator for RecordingCreator {
        async fn create_task(&self, user: UserId, payload: TaskPayload) -> Result<Task> {
            if self.fail_text.as_deref() == Some(payload.text.as_str()) {
                return Err(CoreError::TaskCreation("insert failed".into()));
            }
            self.calls.lock().push((user, payload.clone()));
            let ts = Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap();
            Ok(Task {
                id: format!("todo-{}", self.calls.lock().len()),
                user_id: user,
                text: payload.text,
                description: payload.description,
                completed: false,
                priority: payload.priority,
                due_date: payload.due_date,
                project_id: payload.project_id,
                parent_id: payload.parent_id,
                tags: payload.tag_ids,
                recurrence_rule: payload.recurrence_rule,
                is_recurring: payload.is_recurring,
                recurrence_parent_id: payload.recurrence_parent_id,
                created_at: ts,
                updated_at: ts,
                completed_at: None,
            })
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap()
    }

    fn recurring(id: &str, rule: RecurrenceRule) -> Task {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Task {
            id: id.into(),
            user_id: UserId(1),
            text: format!("task {id}"),
            description: Some("details".into()),
            completed: false,
            priority: Priority::High,
            due_date: Some(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()),
            project_id: Some("project-1".into()),
            parent_id: None,
            tags: vec!["tag-a".into(), "tag-b".into()],
            recurrence_rule: Some(rule),
            is_recurring: true,
            recurrence_parent_id: None,
            created_at: ts,
            updated_at: ts,
            completed_at: None,
        }
    }

    fn instantiator(creator: &Arc<RecordingCreator>) -> RecurringTaskInstantiator {
        RecurringTaskInstantiator::new(Arc::clone(creator) as Arc<dyn TaskCreator>)
    }

    #[tokio::test]
    async fn creates_next_with_copied_fields() {
        let creator = Arc::new(RecordingCreator::default());
        let task = recurring("todo-a", RecurrenceRule::weekly(1));

        let created = instantiator(&creator).maybe_generate_next(&task, now()).await.unwrap().unwrap();
        assert_eq!(created.due_date, Some(Utc.with_ymd_and_hms(2024, 1, 22, 9, 0, 0).unwrap()));

        let calls = creator.calls.lock();
        assert_eq!(calls.len(), 1);
        let (user, payload) = &calls[0];
        assert_eq!(*user, UserId(1));
        assert_eq!(payload.text, "task todo-a");
        assert_eq!(payload.description.as_deref(), Some("details"));
        assert_eq!(payload.priority, Priority::High);
        assert_eq!(payload.project_id.as_deref(), Some("project-1"));
        assert_eq!(payload.tag_ids, vec!["tag-a", "tag-b"]);
        assert_eq!(payload.recurrence_rule, task.recurrence_rule);
        assert!(payload.is_recurring);
        assert_eq!(payload.recurrence_parent_id.as_deref(), Some("todo-a"));
    }

    #[tokio::test]
    async fn completed_task_never_generates() {
        let creator = Arc::new(RecordingCreator::default());
        let mut task = recurring("todo-a", RecurrenceRule::daily(1));
        task.completed = true;
        for due in [now() - chrono::Duration::days(30), now() + chrono::Duration::days(30)] {
            task.due_date = Some(due);
            let result = instantiator(&creator).maybe_generate_next(&task, now()).await.unwrap();
            assert_matches!(result, None);
        }
        assert!(creator.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn future_or_missing_due_date_is_ignored() {
        let creator = Arc::new(RecordingCreator::default());
        let inst = instantiator(&creator);
        let mut task = recurring("todo-a", RecurrenceRule::daily(1));

        task.due_date = Some(now() + chrono::Duration::hours(1));
        assert_matches!(inst.maybe_generate_next(&task, now()).await, Ok(None));

        task.due_date = Some(now());
        assert_matches!(inst.maybe_generate_next(&task, now()).await, Ok(None));

        task.due_date = None;
        assert_matches!(inst.maybe_generate_next(&task, now()).await, Ok(None));
        assert!(creator.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn past_end_date_terminates_without_creating() {
        let creator = Arc::new(RecordingCreator::default());
        let rule = RecurrenceRule::weekly(1).until(NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());
        let task = recurring("todo-a", rule);

        let result = instantiator(&creator).maybe_generate_next(&task, now()).await.unwrap();
        assert!(result.is_none());
        assert!(creator.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn end_date_is_inclusive() {
        let creator = Arc::new(RecordingCreator::default());
        let rule = RecurrenceRule::weekly(1).until(NaiveDate::from_ymd_opt(2024, 1, 22).unwrap());
        let task = recurring("todo-a", rule);

        let result = instantiator(&creator).maybe_generate_next(&task, now()).await.unwrap();
        assert!(result.is_some());
    }

    #[tokio::test]
    async fn subtask_keeps_parent() {
        let creator = Arc::new(RecordingCreator::default());
        let mut task = recurring("todo-a", RecurrenceRule::daily(1));
        task.parent_id = Some("todo-root".into());

        let created = instantiator(&creator).maybe_generate_next(&task, now()).await.unwrap().unwrap();
        assert_eq!(created.parent_id.as_deref(), Some("todo-root"));
    }

    #[tokio::test]
    async fn timezone_controls_calendar_step() {
        let creator = Arc::new(RecordingCreator::default());
        let mut task = recurring("todo-a", RecurrenceRule::monthly(1));
        // Jan 31 23:30 in Moscow
        task.due_date = Some(Utc.with_ymd_and_hms(2023, 1, 31, 20, 30, 0).unwrap());

        let created = instantiator(&creator)
            .with_timezone(chrono_tz::Europe::Moscow)
            .maybe_generate_next(&task, now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.due_date, Some(Utc.with_ymd_and_hms(2023, 2, 28, 20, 30, 0).unwrap()));
    }

    #[tokio::test]
    async fn process_all_only_generates_for_open_overdue_recurring() {
        let creator = Arc::new(RecordingCreator::default());

        let eligible = recurring("todo-a", RecurrenceRule::daily(1));
        let mut plain = recurring("todo-b", RecurrenceRule::daily(1));
        plain.is_recurring = false;
        plain.recurrence_rule = None;
        let mut done = recurring("todo-c", RecurrenceRule::daily(1));
        done.completed = true;

        let report = instantiator(&creator).process_all(&[eligible, plain, done], now()).await;
        assert_eq!(report.generated, 1);
        assert_eq!(report.failed, 0);
        let calls = creator.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1.recurrence_parent_id.as_deref(), Some("todo-a"));
    }

    #[tokio::test]
    async fn process_all_continues_after_failure() {
        let creator = Arc::new(RecordingCreator {
            fail_text: Some("task todo-a".into()),
            ..Default::default()
        });
        let tasks = [
            recurring("todo-a", RecurrenceRule::daily(1)),
            recurring("todo-b", RecurrenceRule::daily(1)),
        ];

        let report = instantiator(&creator).process_all(&tasks, now()).await;
        assert_eq!(
            report,
            ProcessReport {
                eligible: 2,
                generated: 1,
                terminated: 0,
                failed: 1
            }
        );
    }
}
