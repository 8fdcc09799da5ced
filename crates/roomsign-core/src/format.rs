//! Human-readable rendering of schedules and status boundaries.
//!
//! Times are rendered in the timezone carried by the values themselves, so
//! a schedule built from a zoned "now" prints in that zone.

use chrono::{DateTime, Duration, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

/// Text shown for a day without open ranges.
pub const DEFAULT_CLOSED_TEXT: &str = "Closed";

/// Time format preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    /// 12-hour format with AM/PM (e.g., "2:30 PM").
    #[default]
    H12,
    /// 24-hour format (e.g., "14:30").
    H24,
}

impl TimeFormat {
    fn pattern(self) -> &'static str {
        match self {
            Self::H12 => "%-I:%M %p",
            Self::H24 => "%H:%M",
        }
    }
}

/// Options for rendering schedules and status text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    /// Clock style for rendered times.
    pub time_format: TimeFormat,
    /// Placeholder for days without open ranges.
    pub closed_text: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            time_format: TimeFormat::H12,
            closed_text: DEFAULT_CLOSED_TEXT.to_string(),
        }
    }
}

impl FormatOptions {
    /// Sets the time format.
    #[must_use]
    pub fn with_time_format(mut self, time_format: TimeFormat) -> Self {
        self.time_format = time_format;
        self
    }

    /// Sets the text used for closed days.
    #[must_use]
    pub fn with_closed_text(mut self, text: impl Into<String>) -> Self {
        self.closed_text = text.into();
        self
    }

    /// Formats a single time of day.
    pub fn time<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        instant.format(self.time_format.pattern()).to_string()
    }

    /// Formats a status boundary relative to `now`.
    ///
    /// Same day gives `until 5:00 PM`, the next day `until 9:00 AM tomorrow`
    /// and anything later `until Friday 9:00 AM`.
    pub fn until<Tz: TimeZone>(&self, boundary: &DateTime<Tz>, now: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        let boundary_day = boundary.date_naive();
        let today = now.date_naive();
        let time = self.time(boundary);

        if boundary_day == today {
            format!("until {time}")
        } else if boundary_day == today + Duration::days(1) {
            format!("until {time} tomorrow")
        } else {
            format!("until {} {time}", boundary.format("%A"))
        }
    }
}

/// A day of the schedule rendered as display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRanges {
    /// The calendar day.
    pub day: NaiveDate,
    /// `"9:00 AM - 5:00 PM"` strings, or the closed placeholder alone.
    pub ranges: Vec<String>,
}

/// Renders every day of a schedule as display strings.
pub fn format_schedule<Tz: TimeZone>(
    schedule: &[crate::DaySchedule<Tz>],
    options: &FormatOptions,
) -> Vec<ScheduleRanges>
where
    Tz::Offset: std::fmt::Display,
{
    schedule
        .iter()
        .map(|day| {
            let ranges = if day.is_closed() {
                vec![options.closed_text.clone()]
            } else {
                day.ranges
                    .iter()
                    .map(|r| format!("{} - {}", options.time(&r.start), options.time(&r.end)))
                    .collect()
            };
            ScheduleRanges {
                day: day.day,
                ranges,
            }
        })
        .collect()
}
