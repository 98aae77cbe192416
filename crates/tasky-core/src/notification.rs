//! Notification classes.

use serde::{Deserialize, Serialize};

/// Kind of scheduled notification. Each fires at most once per user per local day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationClass {
    /// Tasks due today.
    DailySummary,
    /// Tasks due N days from today.
    Reminder,
    /// Incomplete tasks due before today.
    Overdue,
}

impl NotificationClass {
    /// All classes in the order the engine evaluates them.
    pub const ALL: [Self; 3] = [Self::DailySummary, Self::Reminder, Self::Overdue];

    /// Stable label used in logs and metric labels.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DailySummary => "daily-summary",
            Self::Reminder => "reminder",
            Self::Overdue => "overdue",
        }
    }
}

impl std::fmt::Display for NotificationClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
