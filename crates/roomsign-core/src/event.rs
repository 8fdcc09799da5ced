//! Simplified calendar events consumed by the schedule builder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::DateRange;

/// A calendar event reduced to what availability needs: a summary and two
/// absolute instants.
///
/// Feed parsers (iCalendar expansion, JSON event lists) produce these; the
/// [`ScheduleBuilder`](crate::schedule::ScheduleBuilder) turns them into
/// per-day ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEvent {
    /// The event title.
    pub summary: String,
    /// When the event starts.
    pub start: DateTime<Utc>,
    /// When the event ends.
    pub end: DateTime<Utc>,
}

impl ScheduleEvent {
    /// Creates a new schedule event.
    pub fn new(summary: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            summary: summary.into(),
            start,
            end,
        }
    }

    /// The event as a range, or `None` when it ends before it starts.
    pub fn range(&self) -> Option<DateRange<Utc>> {
        DateRange::try_new(self.start, self.end)
    }

    /// Returns true if the event overlaps `window` with positive length.
    pub fn overlaps(&self, window: &DateRange<Utc>) -> bool {
        self.range().is_some_and(|range| range.overlaps(window))
    }

    /// Returns true if the summary contains `keyword`, ignoring case.
    pub fn mentions(&self, keyword: &str) -> bool {
        self.summary
            .to_lowercase()
            .contains(&keyword.to_lowercase())
    }
}
