//! VEVENT templates and their expansion into instances.

use chrono::{DateTime, Duration, Utc};
use ical::parser::ical::component::IcalEvent;
use tracing::{debug, trace};

use super::datetime::IcalTime;
use super::duration::parse_duration;
use super::rule::Rule;
use super::timezone::TimezoneTable;
use super::{find_properties, find_property, has_property};
use crate::error::{FeedError, FeedResult};

/// How an event's end is derived from its start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventEnd {
    /// DTEND, stored as the template's end minus start.
    Explicit { delta: Duration },
    /// DURATION.
    Duration { delta: Duration },
}

impl EventEnd {
    pub fn delta(&self) -> Duration {
        match self {
            Self::Explicit { delta } | Self::Duration { delta } => *delta,
        }
    }
}

/// RRULE plus the EXDATE values removed from it.
#[derive(Debug, Clone)]
pub struct RecurrenceSet {
    pub rule: Rule,
    pub exclusions: Vec<IcalTime>,
}

/// A parsed VEVENT, possibly recurring.
#[derive(Debug, Clone)]
pub struct Event {
    pub title: String,
    pub description: Option<String>,
    pub start: IcalTime,
    pub end: EventEnd,
    pub all_day: bool,
    pub recurrence: Option<RecurrenceSet>,
    /// Zone floating and date-only values are read in when they must be
    /// compared with absolute instants.
    pub floating_zone: chrono_tz::Tz,
}

/// One materialized occurrence. It owns its data and never points back at
/// the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInstance {
    pub title: String,
    pub description: Option<String>,
    pub start: IcalTime,
    pub end: IcalTime,
    pub all_day: bool,
}

impl Event {
    /// Builds an event from a parsed VEVENT, reading floating values as UTC.
    pub fn from_ical(event: &IcalEvent, table: &TimezoneTable) -> FeedResult<Self> {
        Self::from_ical_in(event, table, chrono_tz::UTC)
    }

    /// Builds an event from a parsed VEVENT.
    ///
    /// `table` and `floating_zone` are only consulted when two values are
    /// expressed in different frames and need absolute instants, as for a
    /// zoned DTSTART with a floating DTEND.
    pub fn from_ical_in(
        event: &IcalEvent,
        table: &TimezoneTable,
        floating_zone: chrono_tz::Tz,
    ) -> FeedResult<Self> {
        let props = &event.properties;

        let title = find_property(props, "SUMMARY")
            .and_then(|p| p.value.as_deref())
            .map(unescape_text)
            .unwrap_or_default();

        if has_property(props, "RDATE") {
            return Err(FeedError::unsupported_recurrence(
                format!("VEVENT {title:?}"),
                "RDATE",
            ));
        }

        let description = find_property(props, "DESCRIPTION")
            .and_then(|p| p.value.as_deref())
            .map(unescape_text);

        let start_prop = find_property(props, "DTSTART")
            .ok_or_else(|| FeedError::missing_property(format!("VEVENT {title:?}"), "DTSTART"))?;
        let start = IcalTime::from_property(start_prop)?;
        let all_day = start.is_date();

        let end = if let Some(dtend) = find_property(props, "DTEND") {
            let end = IcalTime::from_property(dtend)?;
            EventEnd::Explicit {
                delta: difference(&start, &end, table, &floating_zone)?,
            }
        } else if let Some(duration) = find_property(props, "DURATION") {
            let value = duration.value.as_deref().unwrap_or_default();
            EventEnd::Duration {
                delta: parse_duration(value)?,
            }
        } else {
            return Err(FeedError::missing_end(title));
        };

        let recurrence = match find_property(props, "RRULE").and_then(|p| p.value.as_deref()) {
            Some(rule) => {
                let mut exclusions = Vec::new();
                for exdate in find_properties(props, "EXDATE") {
                    exclusions.extend(IcalTime::list_from_property(exdate)?);
                }
                Some(RecurrenceSet {
                    rule: Rule::compile(start.wall_clock(), rule)?,
                    exclusions,
                })
            }
            None => None,
        };

        trace!(%title, %start, recurring = recurrence.is_some(), "Parsed VEVENT");
        Ok(Self {
            title,
            description,
            start,
            end,
            all_day,
            recurrence,
            floating_zone,
        })
    }

    /// Instances of the event for the window `[start, end]`.
    ///
    /// A non-recurring event yields itself regardless of the window. A
    /// recurring one yields the rule's occurrences over the window widened
    /// by the event length plus a day on each side, minus its exclusions.
    pub fn instances_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        table: &TimezoneTable,
    ) -> FeedResult<Vec<EventInstance>> {
        let Some(recurrence) = &self.recurrence else {
            return Ok(vec![self.instance_at(self.start.clone(), table)?]);
        };

        let out_of_range = |at: DateTime<Utc>| {
            FeedError::invalid_datetime(at.to_rfc3339(), "expansion window out of range")
        };
        let length = self.end.delta().max(Duration::zero());
        let from = start
            .naive_utc()
            .checked_sub_signed(length)
            .and_then(|t| t.checked_sub_signed(Duration::days(1)))
            .ok_or_else(|| out_of_range(start))?;
        let to = end
            .naive_utc()
            .checked_add_signed(Duration::days(1))
            .ok_or_else(|| out_of_range(end))?;

        let mut instances = Vec::new();
        for wall_clock in recurrence.rule.between(from, to) {
            let occurrence = self.start.with_wall_clock(wall_clock);
            if self.is_excluded(&occurrence, recurrence, table)? {
                trace!(title = %self.title, %occurrence, "Occurrence excluded");
                continue;
            }
            instances.push(self.instance_at(occurrence, table)?);
        }

        debug!(
            title = %self.title,
            rule = %recurrence.rule.text(),
            count = instances.len(),
            "Expanded recurring event"
        );
        Ok(instances)
    }

    fn instance_at(&self, start: IcalTime, table: &TimezoneTable) -> FeedResult<EventInstance> {
        let end = self.end_for(&start, table)?;
        Ok(EventInstance {
            title: self.title.clone(),
            description: self.description.clone(),
            start,
            end,
            all_day: self.all_day,
        })
    }

    /// Ends follow the kind of the occurrence start, except a duration after
    /// a zoned start, which is added to the resolved instant so the offset
    /// in effect at that occurrence applies.
    fn end_for(&self, start: &IcalTime, table: &TimezoneTable) -> FeedResult<IcalTime> {
        match self.end {
            EventEnd::Duration { delta } if matches!(start, IcalTime::Zoned { .. }) => {
                let resolved = table.resolve(start, &self.floating_zone)?;
                resolved.checked_add_signed(delta).map(IcalTime::Utc).ok_or_else(|| {
                    FeedError::invalid_datetime(start.to_string(), "end out of range")
                })
            }
            EventEnd::Duration { delta } | EventEnd::Explicit { delta } => start.shifted(delta),
        }
    }

    fn is_excluded(
        &self,
        occurrence: &IcalTime,
        recurrence: &RecurrenceSet,
        table: &TimezoneTable,
    ) -> FeedResult<bool> {
        for exclusion in &recurrence.exclusions {
            let hit = match exclusion {
                IcalTime::Date(day) => occurrence.wall_clock().date() == *day,
                _ if exclusion.same_frame(occurrence) => {
                    exclusion.wall_clock() == occurrence.wall_clock()
                }
                _ => {
                    table.resolve(exclusion, &self.floating_zone)?
                        == table.resolve(occurrence, &self.floating_zone)?
                }
            };
            if hit {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// End minus start, on wall clocks when both share a frame.
fn difference(
    start: &IcalTime,
    end: &IcalTime,
    table: &TimezoneTable,
    floating_zone: &chrono_tz::Tz,
) -> FeedResult<Duration> {
    if start.same_frame(end) {
        return Ok(end.wall_clock() - start.wall_clock());
    }
    Ok(table.resolve(end, floating_zone)? - table.resolve(start, floating_zone)?)
}

/// Undoes TEXT escaping (`\n`, `\,`, `\;`, `\\`).
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ics::tests::{EASTERN_VTIMEZONE, calendar_text, parse_one};
    use chrono::{NaiveDate, NaiveDateTime, TimeZone};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    /// Parses a single VEVENT, with the Eastern timezone available.
    fn parse_event(lines: &[&str]) -> FeedResult<(Event, TimezoneTable)> {
        parse_event_in(lines, chrono_tz::UTC)
    }

    fn parse_event_in(lines: &[&str], zone: chrono_tz::Tz) -> FeedResult<(Event, TimezoneTable)> {
        let mut all: Vec<&str> = EASTERN_VTIMEZONE.to_vec();
        all.push("BEGIN:VEVENT");
        all.extend_from_slice(lines);
        all.push("END:VEVENT");
        let cal = parse_one(&calendar_text(&all));
        let table = TimezoneTable::from_ical(&cal.timezones)?;
        let event = Event::from_ical_in(&cal.events[0], &table, zone)?;
        Ok((event, table))
    }

    mod parsing {
        use super::*;

        #[test]
        fn explicit_end_delta() {
            let (event, _) = parse_event(&[
                "SUMMARY:Open lab",
                "DESCRIPTION:Bring a badge\\, please",
                "DTSTART:20250205T140000Z",
                "DTEND:20250205T170000Z",
            ])
            .unwrap();
            assert_eq!(event.title, "Open lab");
            assert_eq!(event.description.as_deref(), Some("Bring a badge, please"));
            assert_eq!(event.end, EventEnd::Explicit { delta: Duration::hours(3) });
            assert!(!event.all_day);
            assert!(event.recurrence.is_none());
        }

        #[test]
        fn duration_end() {
            let (event, _) = parse_event(&[
                "SUMMARY:Open",
                "DTSTART;TZID=Eastern:20250205T090000",
                "DURATION:PT45M",
            ])
            .unwrap();
            assert_eq!(event.end, EventEnd::Duration { delta: Duration::minutes(45) });
        }

        #[test]
        fn all_day_event() {
            let (event, _) = parse_event(&[
                "SUMMARY:Open day",
                "DTSTART;VALUE=DATE:20250205",
                "DTEND;VALUE=DATE:20250206",
            ])
            .unwrap();
            assert!(event.all_day);
            assert_eq!(event.end.delta(), Duration::days(1));
        }

        #[test]
        fn missing_end_is_an_error() {
            let err = parse_event(&["SUMMARY:Open", "DTSTART:20250205T140000Z"]).unwrap_err();
            assert!(matches!(err, FeedError::MissingEndSpecification { .. }));
        }

        #[test]
        fn date_start_without_end_is_still_an_error() {
            let err = parse_event(&["SUMMARY:Open", "DTSTART;VALUE=DATE:20250205"]).unwrap_err();
            assert!(matches!(err, FeedError::MissingEndSpecification { .. }));
        }

        #[test]
        fn rdate_is_unsupported() {
            let err = parse_event(&[
                "SUMMARY:Open",
                "DTSTART:20250205T140000Z",
                "DTEND:20250205T150000Z",
                "RDATE:20250210T140000Z",
            ])
            .unwrap_err();
            insta::assert_snapshot!(err, @r#"Unsupported recurrence in VEVENT "Open": RDATE"#);
        }

        #[test]
        fn missing_start_is_an_error() {
            let err = parse_event(&["SUMMARY:Open", "DTEND:20250205T150000Z"]).unwrap_err();
            assert!(matches!(err, FeedError::MissingProperty { .. }));
        }

        #[test]
        fn mixed_frame_end_reads_floating_in_zone() {
            let lines = [
                "SUMMARY:Open",
                "DTSTART;TZID=Eastern:20250205T090000",
                "DTEND:20250205T170000",
            ];
            let (event, _) = parse_event_in(&lines, chrono_tz::America::New_York).unwrap();
            assert_eq!(event.end.delta(), Duration::hours(8));
            assert_eq!(event.floating_zone, chrono_tz::America::New_York);

            let (event, _) = parse_event(&lines).unwrap();
            assert_eq!(event.end.delta(), Duration::hours(3));
        }

        #[test]
        fn unescapes_text() {
            assert_eq!(unescape_text(r"a\nb\;c\\d"), "a\nb;c\\d");
        }
    }

    mod expansion {
        use super::*;

        #[test]
        fn non_recurring_event_is_returned_unconditionally() {
            let (event, table) = parse_event(&[
                "SUMMARY:Open",
                "DTSTART:20240101T090000Z",
                "DTEND:20240101T100000Z",
            ])
            .unwrap();
            let instances = event
                .instances_between(utc(2025, 2, 5, 0, 0), utc(2025, 2, 12, 0, 0), &table)
                .unwrap();
            assert_eq!(instances.len(), 1);
            assert_eq!(instances[0].start, IcalTime::Utc(utc(2024, 1, 1, 9, 0)));
            assert_eq!(instances[0].end, IcalTime::Utc(utc(2024, 1, 1, 10, 0)));
        }

        #[test]
        fn daily_rule_with_one_exdate_over_a_week() {
            let (event, table) = parse_event(&[
                "SUMMARY:Open",
                "DTSTART:20250203T090000Z",
                "DTEND:20250203T170000Z",
                "RRULE:FREQ=DAILY",
                "EXDATE:20250207T090000Z",
            ])
            .unwrap();
            let instances = event
                .instances_between(utc(2025, 2, 3, 9, 0), utc(2025, 2, 9, 9, 0), &table)
                .unwrap();
            let in_week: Vec<_> = instances
                .iter()
                .filter(|i| {
                    let IcalTime::Utc(start) = i.start else { return false };
                    start >= utc(2025, 2, 3, 0, 0) && start < utc(2025, 2, 10, 0, 0)
                })
                .collect();
            assert_eq!(in_week.len(), 6);
            assert!(
                in_week
                    .iter()
                    .all(|i| i.start != IcalTime::Utc(utc(2025, 2, 7, 9, 0)))
            );
        }

        #[test]
        fn padded_window_reaches_neighbours() {
            let (event, table) = parse_event(&[
                "SUMMARY:Open",
                "DTSTART:20250201T090000Z",
                "DTEND:20250201T100000Z",
                "RRULE:FREQ=DAILY;COUNT=30",
            ])
            .unwrap();
            let instances = event
                .instances_between(utc(2025, 2, 10, 0, 0), utc(2025, 2, 10, 23, 59), &table)
                .unwrap();
            let starts: Vec<_> = instances.iter().map(|i| i.start.wall_clock()).collect();
            assert_eq!(
                starts,
                vec![at(2025, 2, 9, 9, 0), at(2025, 2, 10, 9, 0), at(2025, 2, 11, 9, 0)]
            );
        }

        #[test]
        fn date_exclusion_drops_whole_day() {
            let (event, table) = parse_event(&[
                "SUMMARY:Open",
                "DTSTART;TZID=Eastern:20250203T090000",
                "DTEND;TZID=Eastern:20250203T120000",
                "RRULE:FREQ=DAILY;COUNT=5",
                "EXDATE;VALUE=DATE:20250205",
            ])
            .unwrap();
            let instances = event
                .instances_between(utc(2025, 2, 1, 0, 0), utc(2025, 2, 10, 0, 0), &table)
                .unwrap();
            assert_eq!(instances.len(), 4);
            assert!(
                instances
                    .iter()
                    .all(|i| i.start.wall_clock().date() != NaiveDate::from_ymd_opt(2025, 2, 5).unwrap())
            );
        }

        #[test]
        fn explicit_end_keeps_zoned_kind() {
            let (event, table) = parse_event(&[
                "SUMMARY:Open",
                "DTSTART;TZID=Eastern:20250203T090000",
                "DTEND;TZID=Eastern:20250203T120000",
                "RRULE:FREQ=DAILY;COUNT=2",
            ])
            .unwrap();
            let instances = event
                .instances_between(utc(2025, 2, 1, 0, 0), utc(2025, 2, 10, 0, 0), &table)
                .unwrap();
            assert_eq!(
                instances[1].end,
                IcalTime::Zoned {
                    wall_clock: at(2025, 2, 4, 12, 0),
                    tzid: "Eastern".to_string()
                }
            );
        }

        #[test]
        fn duration_uses_offset_of_each_occurrence() {
            // Daylight time starts on 2025-03-09 in the Eastern definition.
            let (event, table) = parse_event(&[
                "SUMMARY:Open",
                "DTSTART;TZID=Eastern:20250308T090000",
                "DURATION:PT1H",
                "RRULE:FREQ=DAILY;COUNT=2",
            ])
            .unwrap();
            let instances = event
                .instances_between(utc(2025, 3, 1, 0, 0), utc(2025, 3, 15, 0, 0), &table)
                .unwrap();
            assert_eq!(instances.len(), 2);
            assert_eq!(instances[0].end, IcalTime::Utc(utc(2025, 3, 8, 15, 0)));
            assert_eq!(instances[1].end, IcalTime::Utc(utc(2025, 3, 9, 14, 0)));
        }

        #[test]
        fn floating_duration_keeps_kind() {
            let (event, table) = parse_event(&[
                "SUMMARY:Open",
                "DTSTART:20250205T090000",
                "DURATION:PT2H",
            ])
            .unwrap();
            let instances = event
                .instances_between(utc(2025, 2, 1, 0, 0), utc(2025, 2, 10, 0, 0), &table)
                .unwrap();
            assert_eq!(instances[0].end, IcalTime::Floating(at(2025, 2, 5, 11, 0)));
        }

        #[test]
        fn floating_exdate_matches_zoned_occurrence_in_zone() {
            let lines = [
                "SUMMARY:Open",
                "DTSTART;TZID=Eastern:20250203T090000",
                "DTEND;TZID=Eastern:20250203T120000",
                "RRULE:FREQ=DAILY;COUNT=3",
                "EXDATE:20250204T090000",
            ];
            let window = (utc(2025, 2, 1, 0, 0), utc(2025, 2, 10, 0, 0));

            let (event, table) = parse_event_in(&lines, chrono_tz::America::New_York).unwrap();
            let instances = event.instances_between(window.0, window.1, &table).unwrap();
            let days: Vec<_> = instances.iter().map(|i| i.start.wall_clock().date()).collect();
            assert_eq!(
                days,
                vec![
                    NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
                    NaiveDate::from_ymd_opt(2025, 2, 5).unwrap()
                ]
            );

            let (event, table) = parse_event(&lines).unwrap();
            let instances = event.instances_between(window.0, window.1, &table).unwrap();
            assert_eq!(instances.len(), 3);
        }

        #[test]
        fn huge_recurring_duration_is_an_error() {
            let (event, table) = parse_event(&[
                "SUMMARY:Open",
                "DTSTART:20250203T090000Z",
                "DURATION:P14000000W",
                "RRULE:FREQ=DAILY",
            ])
            .unwrap();
            let err = event
                .instances_between(utc(2025, 2, 1, 0, 0), utc(2025, 2, 10, 0, 0), &table)
                .unwrap_err();
            assert!(matches!(err, FeedError::InvalidDateTime { .. }));
        }

        #[test]
        fn huge_single_duration_is_an_error() {
            for start in ["DTSTART:20250203T090000", "DTSTART;TZID=Eastern:20250203T090000"] {
                let (event, table) =
                    parse_event(&["SUMMARY:Open", start, "DURATION:P14000000W"]).unwrap();
                let result =
                    event.instances_between(utc(2025, 2, 1, 0, 0), utc(2025, 2, 10, 0, 0), &table);
                assert!(
                    matches!(result, Err(FeedError::InvalidDateTime { .. })),
                    "{start} should fail"
                );
            }
        }

        #[test]
        fn until_limits_occurrences() {
            let (event, table) = parse_event(&[
                "SUMMARY:Open",
                "DTSTART;VALUE=DATE:20250203",
                "DTEND;VALUE=DATE:20250204",
                "RRULE:FREQ=DAILY;UNTIL=20250205",
            ])
            .unwrap();
            let instances = event
                .instances_between(utc(2025, 2, 1, 0, 0), utc(2025, 2, 10, 0, 0), &table)
                .unwrap();
            assert_eq!(instances.len(), 3);
            assert!(instances.iter().all(|i| i.all_day && i.end.is_date()));
        }
    }
}
