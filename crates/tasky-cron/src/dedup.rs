//! In-memory "already fired today" markers. Lost on restart.

use std::collections::HashMap;

use chrono::NaiveDate;
use tasky_core::UserId;
use tasky_core::notification::NotificationClass;

/// Last local date each `(user, class)` fired on.
#[derive(Debug, Default)]
pub struct NotificationDedupTracker {
    fired: HashMap<(UserId, NotificationClass), NaiveDate>,
}

impl NotificationDedupTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `class` may fire for `user` on `local_date`. Does not record anything.
    ///
    /// A date at or before the last fired date is refused, so a user moving
    /// to a timezone further west cannot get the same day twice.
    pub fn should_fire(&self, user: UserId, class: NotificationClass, local_date: NaiveDate) -> bool {
        self.fired
            .get(&(user, class))
            .is_none_or(|last| *last < local_date)
    }

    /// Record that `class` fired for `user` on `local_date`.
    pub fn mark_fired(&mut self, user: UserId, class: NotificationClass, local_date: NaiveDate) {
        let entry = self.fired.entry((user, class)).or_insert(local_date);
        if *entry < local_date {
            *entry = local_date;
        }
    }

    /// Check and mark in one step. Returns `true` only for the first call per
    /// `(user, class, local_date)`.
    pub fn try_claim(&mut self, user: UserId, class: NotificationClass, local_date: NaiveDate) -> bool {
        if !self.should_fire(user, class, local_date) {
            return false;
        }
        self.mark_fired(user, class, local_date);
        true
    }

    /// Last date `class` fired for `user`.
    pub fn last_fired(&self, user: UserId, class: NotificationClass) -> Option<NaiveDate> {
        self.fired.get(&(user, class)).copied()
    }

    /// Number of tracked `(user, class)` pairs.
    pub fn len(&self) -> usize {
        self.fired.len()
    }

    /// Whether nothing has fired yet.
    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.fired.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    const USER: UserId = UserId(1);
    const DAILY: NotificationClass = NotificationClass::DailySummary;

    #[test]
    fn claim_once_per_day() {
        let mut tracker = NotificationDedupTracker::new();
        assert!(tracker.try_claim(USER, DAILY, day(1)));
        assert!(!tracker.try_claim(USER, DAILY, day(1)));
        assert!(tracker.try_claim(USER, DAILY, day(2)));
    }

    #[test]
    fn should_fire_is_pure_until_marked() {
        let mut tracker = NotificationDedupTracker::new();
        assert!(tracker.should_fire(USER, DAILY, day(1)));
        assert!(tracker.should_fire(USER, DAILY, day(1)));
        tracker.mark_fired(USER, DAILY, day(1));
        assert!(!tracker.should_fire(USER, DAILY, day(1)));
        assert!(tracker.should_fire(USER, DAILY, day(2)));
    }

    #[test]
    fn classes_and_users_are_independent() {
        let mut tracker = NotificationDedupTracker::new();
        tracker.mark_fired(USER, DAILY, day(1));
        assert!(tracker.should_fire(USER, NotificationClass::Overdue, day(1)));
        assert!(tracker.should_fire(UserId(2), DAILY, day(1)));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn earlier_date_never_refires() {
        let mut tracker = NotificationDedupTracker::new();
        tracker.mark_fired(USER, DAILY, day(5));
        assert!(!tracker.should_fire(USER, DAILY, day(4)));
        tracker.mark_fired(USER, DAILY, day(4));
        assert_eq!(tracker.last_fired(USER, DAILY), Some(day(5)));
    }

    #[test]
    fn clear_resets() {
        let mut tracker = NotificationDedupTracker::new();
        tracker.mark_fired(USER, DAILY, day(1));
        tracker.clear();
        assert!(tracker.is_empty());
        assert!(tracker.should_fire(USER, DAILY, day(1)));
    }

    proptest! {
        #[test]
        fn second_claim_same_day_always_refused(user in any::<i64>(), offset in 0i64..3650) {
            let date = day(1) + chrono::Duration::days(offset);
            let mut tracker = NotificationDedupTracker::new();
            prop_assert!(tracker.try_claim(UserId(user), DAILY, date));
            prop_assert!(!tracker.try_claim(UserId(user), DAILY, date));
            prop_assert!(tracker.try_claim(UserId(user), DAILY, date + chrono::Duration::days(1)));
        }
    }
}
