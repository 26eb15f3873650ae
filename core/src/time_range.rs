//! Half-open appointment intervals.
//!
//! A [`TimeRange`] is `[start, end)`: it contains `start` but not `end`, so two
//! back-to-back sessions (`10:00-11:00` and `11:00-12:00`) never conflict.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use mentorship_core::time_range::TimeRange;
//!
//! let morning = TimeRange::new(
//!     Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2025, 3, 3, 11, 0, 0).unwrap(),
//! ).unwrap();
//! let next = TimeRange::new(
//!     Utc.with_ymd_and_hms(2025, 3, 3, 11, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap(),
//! ).unwrap();
//!
//! assert!(!morning.overlaps(&next));
//! ```

use crate::error::{BookingError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated half-open interval `[start, end)` with `start < end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawTimeRange")]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Unvalidated wire form, checked on deserialization.
#[derive(Deserialize)]
struct RawTimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawTimeRange> for TimeRange {
    type Error = BookingError;

    fn try_from(raw: RawTimeRange) -> Result<Self> {
        Self::new(raw.start, raw.end)
    }
}

impl TimeRange {
    /// Build a range, rejecting empty or inverted intervals.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidRange`] when `end <= start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(BookingError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse a range from two RFC 3339 timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] when either timestamp is malformed
    /// and [`BookingError::InvalidRange`] when `end <= start`.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let start = parse_timestamp("start_time", start)?;
        let end = parse_timestamp("end_time", end)?;
        Self::new(start, end)
    }

    /// Inclusive start.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Length of the interval.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// `true` iff the two half-open intervals share at least one instant.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// `true` iff `other` lies entirely inside `self`.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Intersection of two ranges, if they overlap.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        Self::new(start, end).ok()
    }

    /// Remove every `busy` interval from `self`, returning the free pieces in
    /// chronological order.
    #[must_use]
    pub fn subtract_all(&self, busy: &[Self]) -> Vec<Self> {
        let mut blocked: Vec<Self> = busy.iter().filter(|b| b.overlaps(self)).copied().collect();
        blocked.sort();

        let mut free = Vec::new();
        let mut cursor = self.start;
        for block in blocked {
            if block.start > cursor {
                if let Ok(piece) = Self::new(cursor, block.start.min(self.end)) {
                    free.push(piece);
                }
            }
            cursor = cursor.max(block.end);
            if cursor >= self.end {
                return free;
            }
        }
        if let Ok(piece) = Self::new(cursor, self.end) {
            free.push(piece);
        }
        free
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| BookingError::Validation(format!("{field} is not a valid timestamp: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, hour, minute, 0).unwrap()
    }

    fn range(from: (u32, u32), to: (u32, u32)) -> TimeRange {
        TimeRange::new(at(from.0, from.1), at(to.0, to.1)).unwrap()
    }

    #[test]
    fn rejects_empty_and_inverted_ranges() {
        assert!(matches!(
            TimeRange::new(at(10, 0), at(10, 0)),
            Err(BookingError::InvalidRange { .. })
        ));
        assert!(matches!(
            TimeRange::new(at(11, 0), at(10, 0)),
            Err(BookingError::InvalidRange { .. })
        ));
    }

    #[test]
    fn adjacent_ranges_do_not_overlap() {
        let a = range((10, 0), (11, 0));
        let b = range((11, 0), (12, 0));
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn partial_overlap_is_detected() {
        let a = range((10, 0), (11, 0));
        let b = range((10, 30), (11, 30));
        assert!(a.overlaps(&b));
        assert_eq!(a.intersection(&b), Some(range((10, 30), (11, 0))));
    }

    #[test]
    fn parse_reports_malformed_timestamps() {
        let err = TimeRange::parse("yesterday", "2025-03-03T11:00:00Z").unwrap_err();
        assert!(matches!(err, BookingError::Validation(msg) if msg.contains("start_time")));

        let parsed = TimeRange::parse("2025-03-03T10:00:00+01:00", "2025-03-03T11:00:00Z").unwrap();
        assert_eq!(parsed.start(), at(9, 0));
    }

    #[test]
    fn deserialization_validates_ordering() {
        let ok: TimeRange = serde_json::from_str(
            r#"{"start":"2025-03-03T10:00:00Z","end":"2025-03-03T11:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(ok, range((10, 0), (11, 0)));

        let bad = serde_json::from_str::<TimeRange>(
            r#"{"start":"2025-03-03T11:00:00Z","end":"2025-03-03T10:00:00Z"}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn subtract_all_leaves_gaps_between_busy_blocks() {
        let day = range((9, 0), (17, 0));
        let busy = vec![
            range((12, 0), (13, 0)),
            range((9, 0), (10, 0)),
            range((12, 30), (14, 0)),
            range((18, 0), (19, 0)),
        ];
        assert_eq!(
            day.subtract_all(&busy),
            vec![range((10, 0), (12, 0)), range((14, 0), (17, 0))]
        );
    }

    #[test]
    fn subtract_all_fully_covered_is_empty() {
        let slot = range((10, 0), (11, 0));
        assert!(slot.subtract_all(&[range((9, 0), (12, 0))]).is_empty());
    }

    proptest! {
        #[test]
        fn overlaps_is_symmetric_and_reflexive(
            a_start in 0i64..10_000,
            a_len in 1i64..500,
            b_start in 0i64..10_000,
            b_len in 1i64..500,
        ) {
            let base = at(0, 0);
            let a = TimeRange::new(
                base + Duration::minutes(a_start),
                base + Duration::minutes(a_start + a_len),
            ).unwrap();
            let b = TimeRange::new(
                base + Duration::minutes(b_start),
                base + Duration::minutes(b_start + b_len),
            ).unwrap();

            prop_assert!(a.overlaps(&a));
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }
    }
}
