//! Quiet-hours suppression.

use crate::time::parse_hhmm;

/// Whether `minutes_of_day` falls inside the quiet window.
///
/// The start bound is inclusive and the end bound exclusive. A window whose
/// start is after its end wraps past midnight. Missing or unparseable bounds,
/// and a zero-length window, never suppress.
#[must_use]
pub fn is_suppressed(minutes_of_day: u32, start: Option<&str>, end: Option<&str>) -> bool {
    let (Some(start), Some(end)) = (start.and_then(parse_hhmm), end.and_then(parse_hhmm)) else {
        return false;
    };
    if start == end {
        false
    } else if start < end {
        start <= minutes_of_day && minutes_of_day < end
    } else {
        minutes_of_day >= start || minutes_of_day < end
    }
}
