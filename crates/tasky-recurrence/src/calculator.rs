//! Next-occurrence arithmetic.
//!
//! All functions here are pure. Calendar math is done on local wall-clock
//! values so that "every day at 09:00" stays at 09:00 across DST changes.
//!
//! Month-end policy: results clamp to the last day of the target month.
//! January 31 plus one month is February 28 (29 in leap years), a
//! `dayOfMonth` of 31 lands on April 30, and February 29 plus one year is
//! February 28. Dates never roll into the following month.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tasky_core::task::{RecurrenceRule, RecurrenceType};
use tasky_core::time::local_to_utc;

/// Compute the occurrence that follows `base` under `rule`.
///
/// The time of day of `base` is preserved. Missing or invalid `daysOfWeek`
/// and `dayOfMonth` fall back to plain interval stepping. Arithmetic past
/// the representable calendar saturates at [`NaiveDateTime::MAX`].
#[must_use]
pub fn compute_next_occurrence(base: NaiveDateTime, rule: &RecurrenceRule) -> NaiveDateTime {
    next_occurrence(base, rule).unwrap_or(NaiveDateTime::MAX)
}

/// Like [`compute_next_occurrence`], with the calendar step taken in `tz`.
///
/// A result that lands in a DST gap moves to the first valid instant after it.
#[must_use]
pub fn compute_next_occurrence_in(base: DateTime<Utc>, rule: &RecurrenceRule, tz: Tz) -> DateTime<Utc> {
    let local = base.with_timezone(&tz).naive_local();
    let next = compute_next_occurrence(local, rule);
    if next == NaiveDateTime::MAX {
        return DateTime::<Utc>::MAX_UTC;
    }
    local_to_utc(tz, next)
}

fn next_occurrence(base: NaiveDateTime, rule: &RecurrenceRule) -> Option<NaiveDateTime> {
    let interval = rule.effective_interval();
    match rule.kind {
        RecurrenceType::Daily => base.checked_add_days(Days::new(u64::from(interval))),
        RecurrenceType::Weekly => {
            let days = rule.sorted_weekdays();
            if days.is_empty() {
                base.checked_add_days(Days::new(7 * u64::from(interval)))
            } else {
                base.checked_add_days(Days::new(days_until_next_weekday(base.date(), &days)))
            }
        }
        RecurrenceType::Monthly => {
            let stepped = base.checked_add_months(Months::new(interval))?;
            match rule.valid_day_of_month() {
                Some(day) => with_clamped_day(stepped, u32::from(day)),
                None => Some(stepped),
            }
        }
        RecurrenceType::Yearly => base.checked_add_months(Months::new(interval.checked_mul(12)?)),
    }
}

/// Days from `date` to the next listed weekday strictly after it.
/// `weekdays` must be sorted, non-empty and within `0..=6`.
fn days_until_next_weekday(date: NaiveDate, weekdays: &[u8]) -> u64 {
    let current = date.weekday().num_days_from_sunday() as u8;
    match weekdays.iter().find(|d| **d > current) {
        Some(next) => u64::from(next - current),
        None => u64::from(7 - current + weekdays[0]),
    }
}

fn with_clamped_day(value: NaiveDateTime, day: u32) -> Option<NaiveDateTime> {
    let date = value.date();
    let day = day.min(days_in_month(date.year(), date.month())?);
    date.with_day(day).map(|d| d.and_time(value.time()))
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = first.checked_add_months(Months::new(1))?;
    Some(next_first.signed_duration_since(first).num_days() as u32)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
