//! Weekly availability from "open" events.
//!
//! The builder keeps events whose summary mentions the open keyword, clips
//! them to the seven-day window starting today, splits them at local
//! midnight and merges overlapping pieces per day:
//!
//! ```text
//! events ─▶ keyword filter ─▶ window filter ─▶ clip ─▶ split by day
//!                                                          │
//!        [DaySchedule; 7] ◀── merge per day ◀── bucket by weekday
//! ```

use chrono::{DateTime, Datelike, Duration, TimeZone};
use tracing::{debug, trace, warn};

use crate::event::ScheduleEvent;
use crate::time::{DateRange, DaySchedule, end_of_day, start_of_day};

/// Number of days covered by a schedule, today included.
pub const SCHEDULE_DAYS: usize = 7;

/// Summary keyword marking an event as open time.
pub const DEFAULT_OPEN_KEYWORD: &str = "open";

/// Builds seven-day schedules from simplified events.
#[derive(Debug, Clone)]
pub struct ScheduleBuilder {
    keyword: String,
}

impl Default for ScheduleBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_OPEN_KEYWORD)
    }
}

impl ScheduleBuilder {
    /// Creates a builder matching summaries against `keyword`.
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into().to_lowercase(),
        }
    }

    /// Returns the keyword used to select open events.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Builds the schedule for the seven days starting on `now`'s day.
    ///
    /// Day boundaries and weekday buckets are computed in `now`'s timezone.
    /// The result always holds [`SCHEDULE_DAYS`] entries, index 0 being today.
    pub fn build<Tz: TimeZone>(
        &self,
        events: &[ScheduleEvent],
        now: &DateTime<Tz>,
    ) -> Vec<DaySchedule<Tz>> {
        let tz = now.timezone();
        let today = now.date_naive();
        let window_start = start_of_day(today, &tz);
        let window_end = end_of_day(today + Duration::days(SCHEDULE_DAYS as i64 - 1), &tz);

        let mut buckets: Vec<Vec<DateRange<Tz>>> = vec![Vec::new(); SCHEDULE_DAYS];

        for event in events.iter().filter(|e| e.mentions(&self.keyword)) {
            let Some(range) = event.range() else {
                warn!(summary = %event.summary, "Skipping event that ends before it starts");
                continue;
            };
            let range = range.with_timezone(&tz);

            let Some(clipped) = range.clip(&window_start, &window_end) else {
                trace!(summary = %event.summary, "Event outside schedule window");
                continue;
            };

            for piece in clipped.split_by_day() {
                // A range ending exactly at midnight leaves an empty tail on the next day.
                if piece.is_empty() {
                    continue;
                }
                let offset = weekday_offset(&piece.start, now);
                buckets[offset].push(piece);
            }
        }

        let schedule: Vec<DaySchedule<Tz>> = buckets
            .into_iter()
            .enumerate()
            .map(|(index, ranges)| {
                DaySchedule::new(today + Duration::days(index as i64), merge_ranges(ranges))
            })
            .collect();

        debug!(
            keyword = %self.keyword,
            open_days = schedule.iter().filter(|d| !d.is_closed()).count(),
            "Built weekly schedule"
        );

        schedule
    }
}

/// Builds the schedule with the default "open" keyword.
pub fn build_schedule<Tz: TimeZone>(
    events: &[ScheduleEvent],
    now: &DateTime<Tz>,
) -> Vec<DaySchedule<Tz>> {
    ScheduleBuilder::default().build(events, now)
}

/// Days between `now`'s weekday and `instant`'s weekday, in `0..7`.
fn weekday_offset<Tz: TimeZone>(instant: &DateTime<Tz>, now: &DateTime<Tz>) -> usize {
    let day = instant.weekday().num_days_from_sunday();
    let today = now.weekday().num_days_from_sunday();
    ((day + 7 - today) % 7) as usize
}

/// Sorts ranges by start and merges every pair where one ends after the
/// next begins.
///
/// Touching ranges (`a.end == b.start`) stay separate. Merging an already
/// merged list returns it unchanged.
pub fn merge_ranges<Tz: TimeZone>(mut ranges: Vec<DateRange<Tz>>) -> Vec<DateRange<Tz>> {
    ranges.sort_by(|a, b| a.start.cmp(&b.start));

    let mut merged: Vec<DateRange<Tz>> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(current) if current.end > range.start => {
                if range.end > current.end {
                    current.end = range.end;
                }
            }
            _ => merged.push(range),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, Utc};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn open(start: DateTime<Utc>, end: DateTime<Utc>) -> ScheduleEvent {
        ScheduleEvent::new("Open", start, end)
    }

    fn range(start: DateTime<Utc>, end: DateTime<Utc>) -> DateRange<Utc> {
        DateRange::new(start, end)
    }

    // Wednesday 2025-02-05 12:00 UTC.
    fn now() -> DateTime<Utc> {
        utc(2025, 2, 5, 12, 0)
    }

    mod merging {
        use super::*;

        #[test]
        fn merges_overlaps_and_sorts() {
            let merged = merge_ranges(vec![
                range(utc(2025, 2, 5, 13, 0), utc(2025, 2, 5, 15, 0)),
                range(utc(2025, 2, 5, 9, 0), utc(2025, 2, 5, 11, 0)),
                range(utc(2025, 2, 5, 10, 0), utc(2025, 2, 5, 12, 0)),
                range(utc(2025, 2, 5, 14, 0), utc(2025, 2, 5, 14, 30)),
            ]);
            assert_eq!(
                merged,
                vec![
                    range(utc(2025, 2, 5, 9, 0), utc(2025, 2, 5, 12, 0)),
                    range(utc(2025, 2, 5, 13, 0), utc(2025, 2, 5, 15, 0)),
                ]
            );
        }

        #[test]
        fn chain_of_overlaps_collapses() {
            let merged = merge_ranges(vec![
                range(utc(2025, 2, 5, 9, 0), utc(2025, 2, 5, 10, 30)),
                range(utc(2025, 2, 5, 10, 0), utc(2025, 2, 5, 11, 30)),
                range(utc(2025, 2, 5, 11, 0), utc(2025, 2, 5, 12, 30)),
            ]);
            assert_eq!(merged, vec![range(utc(2025, 2, 5, 9, 0), utc(2025, 2, 5, 12, 30))]);
        }

        #[test]
        fn touching_ranges_stay_separate() {
            let input = vec![
                range(utc(2025, 2, 5, 9, 0), utc(2025, 2, 5, 10, 0)),
                range(utc(2025, 2, 5, 10, 0), utc(2025, 2, 5, 11, 0)),
            ];
            assert_eq!(merge_ranges(input.clone()), input);
        }

        #[test]
        fn merge_is_idempotent() {
            let once = merge_ranges(vec![
                range(utc(2025, 2, 5, 8, 0), utc(2025, 2, 5, 9, 30)),
                range(utc(2025, 2, 5, 9, 0), utc(2025, 2, 5, 10, 0)),
                range(utc(2025, 2, 5, 16, 0), utc(2025, 2, 5, 18, 0)),
                range(utc(2025, 2, 5, 12, 0), utc(2025, 2, 5, 13, 0)),
            ]);
            let twice = merge_ranges(once.clone());
            assert_eq!(once, twice);
        }

        #[test]
        fn merged_ranges_are_sorted_and_disjoint() {
            let merged = merge_ranges(vec![
                range(utc(2025, 2, 5, 20, 0), utc(2025, 2, 5, 21, 0)),
                range(utc(2025, 2, 5, 7, 0), utc(2025, 2, 5, 9, 0)),
                range(utc(2025, 2, 5, 8, 0), utc(2025, 2, 5, 8, 30)),
                range(utc(2025, 2, 5, 15, 0), utc(2025, 2, 5, 20, 30)),
                range(utc(2025, 2, 5, 11, 0), utc(2025, 2, 5, 12, 0)),
            ]);
            for pair in merged.windows(2) {
                assert!(pair[0].start < pair[1].start);
                assert!(pair[0].end <= pair[1].start);
            }
            assert_eq!(merged.len(), 3);
        }
    }

    mod building {
        use super::*;

        #[test]
        fn always_seven_days_starting_today() {
            let schedule = build_schedule(&[], &now());
            assert_eq!(schedule.len(), SCHEDULE_DAYS);
            for (i, day) in schedule.iter().enumerate() {
                assert_eq!(day.day, date(2025, 2, 5) + Duration::days(i as i64));
                assert!(day.is_closed());
            }
        }

        #[test]
        fn keyword_filter() {
            let events = vec![
                ScheduleEvent::new("Office Closed", utc(2025, 2, 5, 9, 0), utc(2025, 2, 5, 10, 0)),
                ScheduleEvent::new("OPEN HOUSE", utc(2025, 2, 5, 14, 0), utc(2025, 2, 5, 16, 0)),
            ];
            let schedule = build_schedule(&events, &now());
            assert_eq!(
                schedule[0].ranges,
                vec![range(utc(2025, 2, 5, 14, 0), utc(2025, 2, 5, 16, 0))]
            );
        }

        #[test]
        fn custom_keyword() {
            let events = vec![ScheduleEvent::new(
                "Lab available",
                utc(2025, 2, 6, 9, 0),
                utc(2025, 2, 6, 10, 0),
            )];
            let schedule = ScheduleBuilder::new("Available").build(&events, &now());
            assert_eq!(schedule[1].ranges.len(), 1);
        }

        #[test]
        fn drops_events_outside_window() {
            let events = vec![
                open(utc(2025, 2, 3, 9, 0), utc(2025, 2, 4, 23, 0)),
                open(utc(2025, 2, 12, 0, 0), utc(2025, 2, 12, 5, 0)),
            ];
            let schedule = build_schedule(&events, &now());
            assert!(schedule.iter().all(|d| d.is_closed()));
        }

        #[test]
        fn clips_event_spanning_whole_window() {
            let events = vec![open(utc(2025, 2, 1, 9, 0), utc(2025, 2, 20, 9, 0))];
            let schedule = build_schedule(&events, &now());
            assert_eq!(schedule[0].ranges[0].start, utc(2025, 2, 5, 0, 0));
            assert_eq!(
                schedule[6].ranges[0].end,
                end_of_day(date(2025, 2, 11), &Utc)
            );
            for day in &schedule {
                assert_eq!(day.ranges.len(), 1);
                assert_eq!(day.ranges[0].start, start_of_day(day.day, &Utc));
                assert_eq!(day.ranges[0].end, end_of_day(day.day, &Utc));
            }
        }

        #[test]
        fn multi_day_event_split_into_buckets() {
            let events = vec![open(utc(2025, 2, 6, 22, 0), utc(2025, 2, 8, 2, 0))];
            let schedule = build_schedule(&events, &now());

            assert_eq!(
                schedule[1].ranges,
                vec![range(utc(2025, 2, 6, 22, 0), end_of_day(date(2025, 2, 6), &Utc))]
            );
            assert_eq!(
                schedule[2].ranges,
                vec![range(utc(2025, 2, 7, 0, 0), end_of_day(date(2025, 2, 7), &Utc))]
            );
            assert_eq!(
                schedule[3].ranges,
                vec![range(utc(2025, 2, 8, 0, 0), utc(2025, 2, 8, 2, 0))]
            );
        }

        #[test]
        fn event_ending_at_midnight_leaves_no_empty_tail() {
            let events = vec![open(utc(2025, 2, 5, 20, 0), utc(2025, 2, 6, 0, 0))];
            let schedule = build_schedule(&events, &now());
            assert_eq!(schedule[0].ranges.len(), 1);
            assert!(schedule[1].is_closed());
        }

        #[test]
        fn overlapping_events_merge_within_day() {
            let events = vec![
                open(utc(2025, 2, 7, 9, 0), utc(2025, 2, 7, 12, 0)),
                open(utc(2025, 2, 7, 11, 0), utc(2025, 2, 7, 14, 0)),
                open(utc(2025, 2, 7, 16, 0), utc(2025, 2, 7, 17, 0)),
            ];
            let schedule = build_schedule(&events, &now());
            assert_eq!(
                schedule[2].ranges,
                vec![
                    range(utc(2025, 2, 7, 9, 0), utc(2025, 2, 7, 14, 0)),
                    range(utc(2025, 2, 7, 16, 0), utc(2025, 2, 7, 17, 0)),
                ]
            );
        }

        #[test]
        fn day_boundaries_follow_now_timezone() {
            // 2025-02-06 03:00 UTC is still Wednesday evening in UTC-5.
            let tz = FixedOffset::east_opt(-5 * 3600).unwrap();
            let now = utc(2025, 2, 5, 17, 0).with_timezone(&tz);
            let events = vec![open(utc(2025, 2, 6, 1, 0), utc(2025, 2, 6, 3, 0))];
            let schedule = build_schedule(&events, &now);
            assert_eq!(schedule[0].day, date(2025, 2, 5));
            assert_eq!(schedule[0].ranges.len(), 1);
            assert!(schedule[1].is_closed());
        }

        #[test]
        fn inverted_event_is_skipped() {
            let events = vec![open(utc(2025, 2, 6, 12, 0), utc(2025, 2, 6, 9, 0))];
            let schedule = build_schedule(&events, &now());
            assert!(schedule.iter().all(|d| d.is_closed()));
        }
    }
}
