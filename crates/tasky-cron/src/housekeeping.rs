//! Daily housekeeping slots.
//!
//! Each job has a fixed UTC time of day and runs at most once per UTC day,
//! on the first tick at or after its slot. Slots do not follow user
//! timezones.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::Serialize;
use tasky_core::time::parse_hhmm;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// A housekeeping job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HousekeepingJob {
    /// Snapshot users whose backup frequency has elapsed.
    Backup,
    /// Delete completed tasks past the user's retention horizon.
    Retention,
    /// Delete completed tasks past the user's archive horizon.
    Archive,
}

impl HousekeepingJob {
    /// All jobs in execution order.
    pub const ALL: [Self; 3] = [Self::Backup, Self::Retention, Self::Archive];

    /// Label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Backup => "backup",
            Self::Retention => "retention",
            Self::Archive => "archive",
        }
    }
}

impl std::fmt::Display for HousekeepingJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UTC slot per job plus the last day each job ran.
#[derive(Debug, Clone)]
pub struct HousekeepingSchedule {
    slots: HashMap<HousekeepingJob, u32>,
    last_run: HashMap<HousekeepingJob, NaiveDate>,
}

impl Default for HousekeepingSchedule {
    fn default() -> Self {
        Self::new(2 * 60, 3 * 60, 3 * 60 + 30)
    }
}

impl HousekeepingSchedule {
    /// Schedule from minutes after UTC midnight.
    pub fn new(backup_at: u32, retention_at: u32, archive_at: u32) -> Self {
        Self {
            slots: HashMap::from([
                (HousekeepingJob::Backup, backup_at),
                (HousekeepingJob::Retention, retention_at),
                (HousekeepingJob::Archive, archive_at),
            ]),
            last_run: HashMap::new(),
        }
    }

    /// Schedule whose slots are never reached.
    pub fn disabled() -> Self {
        Self::new(MINUTES_PER_DAY, MINUTES_PER_DAY, MINUTES_PER_DAY)
    }

    /// Schedule from `HH:mm` strings. `None` if any slot does not parse.
    pub fn from_slots(backup_at: &str, retention_at: &str, archive_at: &str) -> Option<Self> {
        Some(Self::new(
            parse_hhmm(backup_at)?,
            parse_hhmm(retention_at)?,
            parse_hhmm(archive_at)?,
        ))
    }

    /// Slot of `job` in minutes after UTC midnight.
    pub fn slot(&self, job: HousekeepingJob) -> u32 {
        self.slots.get(&job).copied().unwrap_or_default()
    }

    /// Jobs due at `now`, marking each as run for today.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<HousekeepingJob> {
        let today = now.date_naive();
        let minutes = now.hour() * 60 + now.minute();
        let mut due = Vec::new();
        for job in HousekeepingJob::ALL {
            if minutes < self.slot(job) || self.last_run.get(&job) == Some(&today) {
                continue;
            }
            let _ = self.last_run.insert(job, today);
            due.push(job);
        }
        due
    }

    /// Last UTC day `job` ran.
    pub fn last_run(&self, job: HousekeepingJob) -> Option<NaiveDate> {
        self.last_run.get(&job).copied()
    }
}
