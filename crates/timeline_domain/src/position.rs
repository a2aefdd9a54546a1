use chrono::{DateTime, Utc};

use crate::range::DateRange;

/// Horizontal placement of `date` inside `range`, as a percentage in `[0, 100]`.
///
/// A zero-length range places everything at or before its start at 0 and
/// everything after it at 100.
pub fn position(date: DateTime<Utc>, range: &DateRange) -> f64 {
    if range.is_degenerate() {
        return if date <= range.start() { 0.0 } else { 100.0 };
    }
    let offset = (date.timestamp_millis() - range.start().timestamp_millis()) as f64;
    let percentage = offset * 100.0 / range.duration_ms() as f64;
    percentage.clamp(0.0, 100.0)
}

/// Same as [`position`], with absent dates pinned to 0 ("unplaced").
pub fn position_of(date: Option<DateTime<Utc>>, range: &DateRange) -> f64 {
    date.map(|date| position(date, range)).unwrap_or(0.0)
}

pub fn current_marker(now: DateTime<Utc>, range: &DateRange) -> f64 {
    position(now, range)
}
