//! Task and recurrence types.
//!
//! All serializable types use `camelCase` for wire compatibility with the
//! Mini App frontend, which reads and writes recurrence rules as JSON.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::UserId;

// ─────────────────────────────────────────────────────────────────────────────
// Enums
// ─────────────────────────────────────────────────────────────────────────────

/// Task priority level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// No priority set.
    #[default]
    None,
    /// Low priority.
    Low,
    /// Medium priority.
    Medium,
    /// High priority.
    High,
}

impl Priority {
    /// SQL string representation (matches the `todos.priority` CHECK constraint).
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parse the SQL representation. Unknown values map to [`Priority::None`].
    #[must_use]
    pub fn from_sql(value: &str) -> Self {
        match value {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Recurrence frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    /// Every N days.
    Daily,
    /// Every N weeks, or on listed weekdays.
    Weekly,
    /// Every N months, optionally pinned to a day of month.
    Monthly,
    /// Every N years.
    Yearly,
}

impl RecurrenceType {
    /// SQL string representation.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Parse the SQL representation.
    #[must_use]
    pub fn from_sql(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Recurrence rule
// ─────────────────────────────────────────────────────────────────────────────

fn default_interval() -> u32 {
    1
}

/// How a recurring task repeats.
///
/// Only the field that matches [`RecurrenceRule::kind`] is consulted:
/// `days_of_week` for weekly rules, `day_of_month` for monthly rules. The
/// other one is ignored, never rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    /// Repeat frequency.
    #[serde(rename = "type")]
    pub kind: RecurrenceType,
    /// Units between occurrences.
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Last calendar date an occurrence may fall on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Weekday indices, `0` = Sunday through `6` = Saturday.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<u8>>,
    /// Day of month, `1..=31`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u8>,
}

impl RecurrenceRule {
    /// A rule of the given kind with the given interval and no constraints.
    #[must_use]
    pub fn new(kind: RecurrenceType, interval: u32) -> Self {
        Self {
            kind,
            interval,
            end_date: None,
            days_of_week: None,
            day_of_month: None,
        }
    }

    /// Every `interval` days.
    #[must_use]
    pub fn daily(interval: u32) -> Self {
        Self::new(RecurrenceType::Daily, interval)
    }

    /// Every `interval` weeks.
    #[must_use]
    pub fn weekly(interval: u32) -> Self {
        Self::new(RecurrenceType::Weekly, interval)
    }

    /// Every `interval` months.
    #[must_use]
    pub fn monthly(interval: u32) -> Self {
        Self::new(RecurrenceType::Monthly, interval)
    }

    /// Every `interval` years.
    #[must_use]
    pub fn yearly(interval: u32) -> Self {
        Self::new(RecurrenceType::Yearly, interval)
    }

    /// Builder: restrict a weekly rule to the given weekdays.
    #[must_use]
    pub fn on_days(mut self, days: impl Into<Vec<u8>>) -> Self {
        self.days_of_week = Some(days.into());
        self
    }

    /// Builder: pin a monthly rule to a day of month.
    #[must_use]
    pub fn on_day_of_month(mut self, day: u8) -> Self {
        self.day_of_month = Some(day);
        self
    }

    /// Builder: end the series after the given date.
    #[must_use]
    pub fn until(mut self, end: NaiveDate) -> Self {
        self.end_date = Some(end);
        self
    }

    /// Interval with stored zeros treated as one.
    #[must_use]
    pub fn effective_interval(&self) -> u32 {
        self.interval.max(1)
    }

    /// Listed weekdays in ascending order, deduplicated, out-of-range values dropped.
    ///
    /// Returns an empty vector when the rule has no usable weekday list.
    #[must_use]
    pub fn sorted_weekdays(&self) -> Vec<u8> {
        let mut days: Vec<u8> = self
            .days_of_week
            .as_deref()
            .unwrap_or_default()
            .iter()
            .copied()
            .filter(|d| *d <= 6)
            .collect();
        days.sort_unstable();
        days.dedup();
        days
    }

    /// Day of month when it is within `1..=31`.
    #[must_use]
    pub fn valid_day_of_month(&self) -> Option<u8> {
        self.day_of_month.filter(|d| (1..=31).contains(d))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Task
// ─────────────────────────────────────────────────────────────────────────────

/// A todo item owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task ID (`todo-<uuid>`).
    pub id: String,
    /// Owning user.
    pub user_id: UserId,
    /// Title text.
    pub text: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the task is done.
    pub completed: bool,
    /// Priority level.
    pub priority: Priority,
    /// When the task is due.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    /// Owning project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Parent task for subtasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Tag IDs attached to the task.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Recurrence rule, for recurring tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_rule: Option<RecurrenceRule>,
    /// Whether the task belongs to a recurring series.
    pub is_recurring: bool,
    /// The task this instance was generated from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_parent_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// When the task was marked completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Payload for creating a new task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    /// Title text.
    pub text: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Priority level.
    #[serde(default)]
    pub priority: Priority,
    /// Owning project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Parent task for subtasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// When the task is due.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    /// Tag IDs to attach.
    #[serde(default)]
    pub tag_ids: Vec<String>,
    /// Recurrence rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_rule: Option<RecurrenceRule>,
    /// Whether the task belongs to a recurring series.
    #[serde(default)]
    pub is_recurring: bool,
    /// The task this instance was generated from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_parent_id: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
