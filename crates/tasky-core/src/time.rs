//! Per-user local time resolution.
//!
//! Every scheduling decision is made against a [`TimeContext`]: the current
//! instant projected into the user's timezone. Unknown timezone names never
//! fail; they resolve to UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use tracing::debug;

/// Longest DST gap we step across when a local time does not exist.
const MAX_GAP_MINUTES: i64 = 180;

/// The current instant as seen by one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeContext {
    /// Resolved timezone.
    pub tz: Tz,
    /// Calendar date in `tz`.
    pub local_date: NaiveDate,
    /// `local_date` as `YYYY-MM-DD`.
    pub iso_date: String,
    /// Local time as zero-padded 24h `HH:mm`.
    pub hhmm: String,
    /// Minutes since local midnight, `0..1440`.
    pub minutes_of_day: u32,
}

impl TimeContext {
    /// UTC instant of local midnight at the start of `local_date + days`.
    ///
    /// `None` when the date falls outside the representable calendar.
    #[must_use]
    pub fn midnight_plus_days(&self, days: i64) -> Option<DateTime<Utc>> {
        let date = self.local_date.checked_add_signed(Duration::try_days(days)?)?;
        Some(local_midnight_utc(self.tz, date))
    }
}

/// Parse an IANA timezone name, falling back to UTC.
#[must_use]
pub fn resolve_timezone(name: &str) -> Tz {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Tz::UTC;
    }
    match trimmed.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            debug!(timezone = %trimmed, "unknown timezone, using UTC");
            Tz::UTC
        }
    }
}

/// Project `now` into the user's timezone.
#[must_use]
pub fn resolve_user_time(timezone: &str, now: DateTime<Utc>) -> TimeContext {
    let tz = resolve_timezone(timezone);
    let local = now.with_timezone(&tz);
    let local_date = local.date_naive();
    let (hour, minute) = (local.hour(), local.minute());
    TimeContext {
        tz,
        local_date,
        iso_date: local_date.format("%Y-%m-%d").to_string(),
        hhmm: format_hhmm(hour * 60 + minute),
        minutes_of_day: hour * 60 + minute,
    }
}

/// Parse `HH:mm` or `HH:mm:ss` into minutes since midnight.
///
/// Seconds are validated and discarded. Returns `None` for anything else.
#[must_use]
pub fn parse_hhmm(value: &str) -> Option<u32> {
    let mut parts = value.trim().split(':');
    let hour = parse_component(parts.next()?, 23)?;
    let minute = parse_component(parts.next()?, 59)?;
    if let Some(seconds) = parts.next() {
        let _ = parse_component(seconds, 59)?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(hour * 60 + minute)
}

fn parse_component(raw: &str, max: u32) -> Option<u32> {
    if raw.is_empty() || raw.len() > 2 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u32>().ok().filter(|v| *v <= max)
}

/// Format minutes since midnight as zero-padded `HH:mm`.
#[must_use]
pub fn format_hhmm(minutes_of_day: u32) -> String {
    let m = minutes_of_day % (24 * 60);
    format!("{:02}:{:02}", m / 60, m % 60)
}

/// Convert a wall-clock time in `tz` to UTC.
///
/// Ambiguous times (DST fall-back) take the earlier instant. Times inside a
/// DST gap resolve to the first valid instant after the gap.
#[must_use]
pub fn local_to_utc(tz: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    if let Some(dt) = tz.from_local_datetime(&local).earliest() {
        return dt.with_timezone(&Utc);
    }
    for step in 1..=MAX_GAP_MINUTES {
        let Some(probe) = local.checked_add_signed(Duration::minutes(step)) else {
            break;
        };
        if let Some(dt) = tz.from_local_datetime(&probe).earliest() {
            return dt.with_timezone(&Utc);
        }
    }
    Utc.from_utc_datetime(&local)
}

/// UTC instant of local midnight at the start of `date` in `tz`.
#[must_use]
pub fn local_midnight_utc(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    local_to_utc(tz, date.and_time(NaiveTime::MIN))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn moscow_projection() {
        let ctx = resolve_user_time("Europe/Moscow", utc(2024, 1, 15, 6, 0));
        assert_eq!(ctx.tz, chrono_tz::Europe::Moscow);
        assert_eq!(ctx.hhmm, "09:00");
        assert_eq!(ctx.iso_date, "2024-01-15");
        assert_eq!(ctx.minutes_of_day, 540);
    }

    #[test]
    fn local_date_can_differ_from_utc_date() {
        let ctx = resolve_user_time("Asia/Tokyo", utc(2024, 1, 15, 20, 30));
        assert_eq!(ctx.iso_date, "2024-01-16");
        assert_eq!(ctx.hhmm, "05:30");
    }

    #[test]
    fn invalid_timezone_falls_back_to_utc() {
        for name in ["Mars/Olympus", "", "   ", "UTC+3"] {
            let ctx = resolve_user_time(name, utc(2024, 1, 15, 6, 0));
            assert_eq!(ctx.tz, Tz::UTC, "{name}");
            assert_eq!(ctx.hhmm, "06:00");
        }
    }

    #[test]
    fn parse_hhmm_accepts_both_forms() {
        assert_eq!(parse_hhmm("09:00"), Some(540));
        assert_eq!(parse_hhmm("09:00:00"), Some(540));
        assert_eq!(parse_hhmm("23:59"), Some(1439));
        assert_eq!(parse_hhmm("9:05"), Some(545));
    }

    #[test]
    fn parse_hhmm_rejects_garbage() {
        for bad in ["", "24:00", "12:60", "12", "ab:cd", "12:00:61", "12:00:00:00", "-1:00", "123:00"] {
            assert_eq!(parse_hhmm(bad), None, "{bad}");
        }
    }

    #[test]
    fn midnight_in_moscow() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(
            local_midnight_utc(chrono_tz::Europe::Moscow, date),
            utc(2024, 1, 14, 21, 0)
        );
    }

    #[test]
    fn midnight_plus_days_uses_local_calendar() {
        let ctx = resolve_user_time("Europe/Moscow", utc(2024, 1, 15, 6, 0));
        assert_eq!(ctx.midnight_plus_days(0), Some(utc(2024, 1, 14, 21, 0)));
        assert_eq!(ctx.midnight_plus_days(1), Some(utc(2024, 1, 15, 21, 0)));
    }

    #[test]
    fn midnight_plus_days_out_of_range() {
        let ctx = resolve_user_time("UTC", utc(2024, 1, 15, 6, 0));
        assert_eq!(ctx.midnight_plus_days(200_000_000), None);
        assert_eq!(ctx.midnight_plus_days(i64::MAX), None);
    }

    #[test]
    fn gap_resolves_after_transition() {
        // America/Sao_Paulo skipped midnight on 2018-11-04
        let date = NaiveDate::from_ymd_opt(2018, 11, 4).unwrap();
        let midnight = local_midnight_utc(chrono_tz::America::Sao_Paulo, date);
        assert_eq!(midnight, utc(2018, 11, 4, 3, 0));
    }

    proptest! {
        #[test]
        fn hhmm_matches_minutes(secs in 0i64..4_000_000_000i64) {
            let now = DateTime::<Utc>::from_timestamp(secs, 0).unwrap();
            let ctx = resolve_user_time("America/New_York", now);
            prop_assert!(ctx.minutes_of_day < 1440);
            prop_assert_eq!(parse_hhmm(&ctx.hhmm), Some(ctx.minutes_of_day));
            prop_assert_eq!(ctx.iso_date.clone(), ctx.local_date.to_string());
        }
    }
}
