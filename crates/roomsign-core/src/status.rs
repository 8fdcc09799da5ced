//! Live open/closed readout derived from a schedule and the current instant.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::format::FormatOptions;
use crate::time::DaySchedule;

/// Whether the room is open right now, and until when.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomStatus {
    /// True when `now` lies strictly inside an open range.
    pub open: bool,
    /// `until ...` text for the next boundary, empty when there is none.
    pub until: String,
}

impl RoomStatus {
    /// The status when no open range lies ahead.
    pub fn closed_indefinitely() -> Self {
        Self::default()
    }
}

/// Evaluates the room status with default formatting.
pub fn room_status<Tz: TimeZone>(schedule: &[DaySchedule<Tz>], now: &DateTime<Tz>) -> RoomStatus
where
    Tz::Offset: std::fmt::Display,
{
    room_status_with(schedule, now, &FormatOptions::default())
}

/// Evaluates the room status.
///
/// Days are scanned in schedule order and ranges in order within each day.
/// The first range containing `now` (bounds excluded) makes the room open
/// until its end. Otherwise the first range starting after `now` makes it
/// closed until that start, even when it lies on a later day.
pub fn room_status_with<Tz: TimeZone>(
    schedule: &[DaySchedule<Tz>],
    now: &DateTime<Tz>,
    options: &FormatOptions,
) -> RoomStatus
where
    Tz::Offset: std::fmt::Display,
{
    for range in schedule.iter().flat_map(|day| day.ranges.iter()) {
        if range.contains_strictly(now) {
            return RoomStatus {
                open: true,
                until: options.until(&range.end, now),
            };
        }
        if *now < range.start {
            return RoomStatus {
                open: false,
                until: options.until(&range.start, now),
            };
        }
    }
    RoomStatus::closed_indefinitely()
}
