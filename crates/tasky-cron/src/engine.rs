//! The scheduling engine.
//!
//! One [`SchedulingEngine::tick`] per minute decides, for every user, whether
//! a daily summary, reminders or an overdue list is due in that user's local
//! time, sends them, and runs any housekeeping job whose UTC slot has come.
//!
//! Ticks are strictly sequential: `tick` takes `&mut self` and the run loop
//! awaits each tick before asking the clock for the next one.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use serde::Serialize;
use tasky_core::{CoreError, UserId};
use tasky_core::notification::NotificationClass;
use tasky_core::quiet_hours::is_suppressed;
use tasky_core::settings::UserScheduleSettings;
use tasky_core::time::{TimeContext, parse_hhmm, resolve_user_time};
use tasky_core::traits::{Notifier, ScheduleStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::dedup::NotificationDedupTracker;
use crate::housekeeping::{HousekeepingJob, HousekeepingSchedule};
use crate::messages;

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    /// Tick instant.
    pub at: DateTime<Utc>,
    /// Users whose settings were evaluated.
    pub users: usize,
    /// Messages accepted by the notifier.
    pub sent: usize,
    /// Messages the notifier failed to deliver.
    pub failed: usize,
    /// Classes skipped because of quiet hours.
    pub suppressed: usize,
    /// Classes skipped because they already fired today.
    pub already_fired: usize,
    /// Users (or housekeeping steps) that hit a storage error.
    pub errors: usize,
    /// Backups written by housekeeping.
    pub backups: usize,
    /// Completed tasks deleted by housekeeping.
    pub tasks_deleted: u64,
    /// Housekeeping jobs that ran.
    pub housekeeping: Vec<HousekeepingJob>,
}

/// Per-minute notification and housekeeping driver.
pub struct SchedulingEngine {
    store: Arc<dyn ScheduleStore>,
    notifier: Arc<dyn Notifier>,
    dedup: NotificationDedupTracker,
    housekeeping: HousekeepingSchedule,
}

impl SchedulingEngine {
    /// Engine with default housekeeping slots.
    pub fn new(store: Arc<dyn ScheduleStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            dedup: NotificationDedupTracker::new(),
            housekeeping: HousekeepingSchedule::default(),
        }
    }

    /// Builder: replace the housekeeping schedule.
    #[must_use]
    pub fn with_housekeeping(mut self, schedule: HousekeepingSchedule) -> Self {
        self.housekeeping = schedule;
        self
    }

    /// Dedup markers recorded so far.
    pub fn dedup(&self) -> &NotificationDedupTracker {
        &self.dedup
    }

    /// Housekeeping schedule and its run markers.
    pub fn housekeeping(&self) -> &HousekeepingSchedule {
        &self.housekeeping
    }

    /// Drive ticks from `clock` until it runs dry or `cancel` fires.
    pub async fn run<C: Clock>(&mut self, mut clock: C, cancel: CancellationToken) {
        info!("scheduling engine started");
        loop {
            let now = tokio::select! {
                () = cancel.cancelled() => break,
                tick = clock.next_tick() => match tick {
                    Some(now) => now,
                    None => break,
                },
            };
            let report = self.tick(now).await;
            if report.sent + report.failed + report.errors > 0 || !report.housekeeping.is_empty() {
                info!(
                    sent = report.sent,
                    failed = report.failed,
                    errors = report.errors,
                    jobs = report.housekeeping.len(),
                    "tick complete"
                );
            }
        }
        info!("scheduling engine stopped");
    }

    /// Process the minute containing `now`. Never fails: errors are logged,
    /// counted in the report, and the next user is processed.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport {
            at: now,
            ..TickReport::default()
        };

        let all_settings = match self.store.query_user_schedule_settings().await {
            Ok(settings) => settings,
            Err(err) => {
                error!(error = %err, "failed to load user settings, skipping tick");
                counter!("scheduler_user_errors_total").increment(1);
                report.errors += 1;
                return report;
            }
        };
        report.users = all_settings.len();

        for settings in &all_settings {
            if let Err(err) = self.process_user(settings, now, &mut report).await {
                warn!(user_id = %settings.user_id, error = %err, "user skipped after storage error");
                counter!("scheduler_user_errors_total").increment(1);
                report.errors += 1;
            }
        }

        for job in self.housekeeping.take_due(now) {
            self.run_job(job, &all_settings, now, &mut report).await;
            report.housekeeping.push(job);
        }

        report
    }

    // ─────────────────────────────────────────────────────────────────────
    // Notifications
    // ─────────────────────────────────────────────────────────────────────

    async fn process_user(
        &mut self,
        settings: &UserScheduleSettings,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> tasky_core::Result<()> {
        let user = settings.user_id;
        let time = resolve_user_time(&settings.timezone, now);
        let trigger = parse_hhmm(&settings.daily_notification_time);

        for class in NotificationClass::ALL {
            if !settings.class_enabled(class) || trigger != Some(time.minutes_of_day) {
                continue;
            }
            if is_suppressed(
                time.minutes_of_day,
                settings.quiet_hours_start.as_deref(),
                settings.quiet_hours_end.as_deref(),
            ) {
                debug!(user_id = %user, class = %class, "quiet hours");
                report.suppressed += 1;
                continue;
            }
            if !self.dedup.should_fire(user, class, time.local_date) {
                report.already_fired += 1;
                continue;
            }

            let messages = self.compose(class, settings, &time, report).await?;
            // Fired for the day once the query succeeds, whatever the send outcome
            self.dedup.mark_fired(user, class, time.local_date);

            for text in messages {
                self.deliver(user, class, &text, report).await;
            }
        }
        Ok(())
    }

    /// Messages for `class`, one per non-empty task set.
    async fn compose(
        &self,
        class: NotificationClass,
        settings: &UserScheduleSettings,
        time: &TimeContext,
        report: &mut TickReport,
    ) -> tasky_core::Result<Vec<String>> {
        let user = settings.user_id;
        let locale = settings.locale();
        let mut out = Vec::new();

        match class {
            NotificationClass::DailySummary => {
                let tasks = self
                    .store
                    .query_tasks_due_in_range(user, day_start(time, 0)?, day_start(time, 1)?)
                    .await?;
                if !tasks.is_empty() {
                    out.push(messages::daily_summary(&tasks, locale));
                }
            }
            NotificationClass::Reminder => {
                for &days in settings.reminder_days_before.iter().filter(|d| **d > 0) {
                    let offset = i64::from(days);
                    let (Some(start), Some(end)) =
                        (time.midnight_plus_days(offset), time.midnight_plus_days(offset + 1))
                    else {
                        warn!(user_id = %user, days, "reminder offset out of range, skipped");
                        counter!("scheduler_user_errors_total").increment(1);
                        report.errors += 1;
                        continue;
                    };
                    let tasks = self.store.query_tasks_due_in_range(user, start, end).await?;
                    if !tasks.is_empty() {
                        out.push(messages::reminder(days, &tasks, locale, time.tz));
                    }
                }
            }
            NotificationClass::Overdue => {
                let tasks = self.store.query_overdue_tasks(user, day_start(time, 0)?).await?;
                if !tasks.is_empty() {
                    out.push(messages::overdue(&tasks, time.local_date, locale, time.tz));
                }
            }
        }
        Ok(out)
    }

    async fn deliver(&self, user: UserId, class: NotificationClass, text: &str, report: &mut TickReport) {
        let result = self.notifier.send(user, text).await;
        if result.success {
            counter!("notifications_sent_total", "class" => class.as_str()).increment(1);
            info!(user_id = %user, class = %class, "notification sent");
            report.sent += 1;
        } else {
            counter!("notifications_failed_total", "class" => class.as_str()).increment(1);
            warn!(
                user_id = %user,
                class = %class,
                status = ?result.status_code,
                error = result.error.as_deref().unwrap_or("unknown"),
                "notification failed"
            );
            report.failed += 1;
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Housekeeping
    // ─────────────────────────────────────────────────────────────────────

    async fn run_job(
        &self,
        job: HousekeepingJob,
        all_settings: &[UserScheduleSettings],
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) {
        counter!("housekeeping_runs_total", "job" => job.as_str()).increment(1);
        info!(job = %job, users = all_settings.len(), "housekeeping started");

        for settings in all_settings {
            let user = settings.user_id;
            let outcome = match job {
                HousekeepingJob::Backup => {
                    if !settings.backup_due(now) {
                        continue;
                    }
                    self.store.create_backup(user, now).await.map(|summary| {
                        debug!(user_id = %user, backup_id = %summary.id, tasks = summary.task_count, "backup written");
                        report.backups += 1;
                    })
                }
                HousekeepingJob::Retention => {
                    let Some(days) = settings.data_retention_days.filter(|d| *d > 0) else {
                        continue;
                    };
                    self.purge(user, now, days, report).await
                }
                HousekeepingJob::Archive => {
                    if !settings.auto_archive_completed || settings.archive_after_days == 0 {
                        continue;
                    }
                    self.purge(user, now, settings.archive_after_days, report).await
                }
            };
            if let Err(err) = outcome {
                warn!(user_id = %user, job = %job, error = %err, "housekeeping failed for user");
                counter!("scheduler_user_errors_total").increment(1);
                report.errors += 1;
            }
        }
    }

    /// Delete tasks completed more than `days` before `now`.
    async fn purge(&self, user: UserId, now: DateTime<Utc>, days: u32, report: &mut TickReport) -> tasky_core::Result<()> {
        let cutoff = Duration::try_days(i64::from(days))
            .and_then(|age| now.checked_sub_signed(age))
            .ok_or_else(|| CoreError::InvalidValue(format!("cleanup age of {days} days out of range")))?;
        let deleted = self.store.delete_completed_older_than(user, cutoff).await?;
        if deleted > 0 {
            info!(user_id = %user, deleted, "completed tasks removed");
        }
        report.tasks_deleted += deleted;
        Ok(())
    }
}

fn day_start(time: &TimeContext, days: i64) -> tasky_core::Result<DateTime<Utc>> {
    time.midnight_plus_days(days)
        .ok_or_else(|| CoreError::InvalidValue(format!("{} plus {days} days out of range", time.iso_date)))
}
