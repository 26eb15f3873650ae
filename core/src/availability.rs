//! Weekly availability and free/busy computation.
//!
//! Mentors publish recurring weekly windows (UTC). Free slots for a query
//! range are the windows expanded onto concrete dates, clipped to the query,
//! minus every busy interval (non-canceled appointments and active holds).

use crate::error::{BookingError, Result};
use crate::time_range::TimeRange;
use chrono::{Datelike, Duration, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Longest range a free/busy query may span.
pub const MAX_QUERY_DAYS: i64 = 62;

/// A recurring weekly window, e.g. every Monday 09:00-12:00 UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    /// Day of the week
    pub weekday: Weekday,
    /// Inclusive start of day
    pub start_time: NaiveTime,
    /// Exclusive end of day
    pub end_time: NaiveTime,
}

impl AvailabilityWindow {
    /// Build a window, rejecting empty or inverted ones.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] when `end_time <= start_time`.
    pub fn new(weekday: Weekday, start_time: NaiveTime, end_time: NaiveTime) -> Result<Self> {
        if end_time <= start_time {
            return Err(BookingError::Validation(format!(
                "availability on {weekday} must end after it starts"
            )));
        }
        Ok(Self {
            weekday,
            start_time,
            end_time,
        })
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.weekday == other.weekday
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }
}

/// Validate a full weekly schedule before it replaces the stored one.
///
/// # Errors
///
/// Returns [`BookingError::Validation`] for inverted windows or windows that
/// overlap on the same weekday.
pub fn validate_schedule(windows: &[AvailabilityWindow]) -> Result<()> {
    for (i, window) in windows.iter().enumerate() {
        AvailabilityWindow::new(window.weekday, window.start_time, window.end_time)?;
        if windows[i + 1..].iter().any(|other| window.overlaps(other)) {
            return Err(BookingError::Validation(format!(
                "availability windows on {} overlap",
                window.weekday
            )));
        }
    }
    Ok(())
}

/// Concrete intervals produced by the weekly schedule inside `range`.
#[must_use]
pub fn expand(windows: &[AvailabilityWindow], range: &TimeRange) -> Vec<TimeRange> {
    let mut out = Vec::new();
    let last = range.end().date_naive();
    let mut day = range.start().date_naive();
    while day <= last {
        for window in windows.iter().filter(|w| w.weekday == day.weekday()) {
            let start = day.and_time(window.start_time).and_utc();
            let end = day.and_time(window.end_time).and_utc();
            if let Some(piece) = TimeRange::new(start, end)
                .ok()
                .and_then(|w| w.intersection(range))
            {
                out.push(piece);
            }
        }
        day += Duration::days(1);
    }
    out.sort();
    out
}

/// Free and busy intervals for one mentor over a query range.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FreeBusy {
    /// Bookable intervals
    pub free: Vec<TimeRange>,
    /// Intervals taken by appointments or holds, clipped to the query
    pub busy: Vec<TimeRange>,
}

/// Compute free/busy for `range`.
///
/// # Errors
///
/// Returns [`BookingError::Validation`] if `range` is longer than
/// [`MAX_QUERY_DAYS`].
pub fn free_busy(
    windows: &[AvailabilityWindow],
    range: &TimeRange,
    busy: &[TimeRange],
) -> Result<FreeBusy> {
    if range.duration() > Duration::days(MAX_QUERY_DAYS) {
        return Err(BookingError::Validation(format!(
            "availability queries may span at most {MAX_QUERY_DAYS} days"
        )));
    }

    let mut busy: Vec<TimeRange> = busy.iter().filter_map(|b| b.intersection(range)).collect();
    busy.sort();

    let free = expand(windows, range)
        .iter()
        .flat_map(|slot| slot.subtract_all(&busy))
        .collect();

    Ok(FreeBusy { free, busy })
}
