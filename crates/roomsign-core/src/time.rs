//! Time ranges and per-day schedules.
//!
//! This module provides [`DateRange`], a closed interval between two
//! instants in a display timezone, and [`DaySchedule`], the merged ranges
//! of a single calendar day. Day boundaries are always computed in the
//! timezone of the instants involved, so callers pick the local zone by
//! choosing the `Tz` of their "now".

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone};
use serde::Serialize;

/// Returns local midnight at the start of `date` in `tz`.
///
/// When midnight does not exist (a DST gap at 00:00) the first valid
/// instant of the day is used instead.
pub fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(midnight + Duration::hours(1)))
                .earliest()
        })
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}

/// Returns the last millisecond of `date` in `tz` (`23:59:59.999`).
pub fn end_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    let next = date.succ_opt().unwrap_or(date);
    start_of_day(next, tz) - Duration::milliseconds(1)
}

/// A range between two instants, `start <= end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(bound(serialize = "DateTime<Tz>: Serialize"))]
pub struct DateRange<Tz: TimeZone> {
    /// Start of the range.
    pub start: DateTime<Tz>,
    /// End of the range.
    pub end: DateTime<Tz>,
}

impl<Tz: TimeZone> DateRange<Tz> {
    /// Creates a new range.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        assert!(start <= end, "DateRange start must be <= end");
        Self { start, end }
    }

    /// Creates a range, returning `None` when `start` is after `end`.
    pub fn try_new(start: DateTime<Tz>, end: DateTime<Tz>) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Returns true if the range has zero length.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns true if `instant` lies strictly inside the range.
    pub fn contains_strictly(&self, instant: &DateTime<Tz>) -> bool {
        self.start < *instant && *instant < self.end
    }

    /// Returns true if this range and `other` overlap with positive length.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Clamps the range to `[lower, upper]`.
    ///
    /// Returns `None` when the range lies entirely outside the bounds.
    pub fn clip(&self, lower: &DateTime<Tz>, upper: &DateTime<Tz>) -> Option<Self> {
        if self.end < *lower || self.start > *upper {
            return None;
        }
        let start = if self.start < *lower {
            lower.clone()
        } else {
            self.start.clone()
        };
        let end = if self.end > *upper {
            upper.clone()
        } else {
            self.end.clone()
        };
        Self::try_new(start, end)
    }

    /// Splits the range at every local midnight it crosses.
    ///
    /// Every piece but the last ends at `23:59:59.999` of its day and every
    /// piece but the first starts at `00:00` of its day.
    pub fn split_by_day(&self) -> Vec<Self> {
        let tz = self.start.timezone();
        let last_day = self.end.date_naive();
        let mut pieces = Vec::new();
        let mut start = self.start.clone();

        while start.date_naive() < last_day {
            let day = start.date_naive();
            pieces.push(Self {
                start: start.clone(),
                end: end_of_day(day, &tz),
            });
            match day.succ_opt() {
                Some(next) => start = start_of_day(next, &tz),
                None => break,
            }
        }

        pieces.push(Self {
            start,
            end: self.end.clone(),
        });
        pieces
    }

    /// Converts the range into another timezone.
    pub fn with_timezone<Tz2: TimeZone>(&self, tz: &Tz2) -> DateRange<Tz2> {
        DateRange {
            start: self.start.with_timezone(tz),
            end: self.end.with_timezone(tz),
        }
    }
}

/// The merged open ranges of one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(bound(serialize = "DateTime<Tz>: Serialize"))]
pub struct DaySchedule<Tz: TimeZone> {
    /// The calendar day, in the schedule's timezone.
    pub day: NaiveDate,
    /// Disjoint ranges sorted by start.
    pub ranges: Vec<DateRange<Tz>>,
}

impl<Tz: TimeZone> DaySchedule<Tz> {
    /// Creates a day schedule.
    pub fn new(day: NaiveDate, ranges: Vec<DateRange<Tz>>) -> Self {
        Self { day, ranges }
    }

    /// Returns true if the day has no open range.
    pub fn is_closed(&self) -> bool {
        self.ranges.is_empty()
    }
}
