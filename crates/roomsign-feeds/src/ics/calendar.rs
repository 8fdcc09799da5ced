//! Parsed calendars and the instance records they produce.

use chrono::{DateTime, SecondsFormat, Utc};
use ical::parser::ical::component::IcalCalendar;
use roomsign_core::ScheduleEvent;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::datetime::IcalTime;
use super::event::{Event, EventInstance};
use super::sanitize::{SanitizeOptions, sanitize};
use super::timezone::TimezoneTable;
use crate::error::FeedResult;

const FLOATING_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// JSON-ready view of one event instance.
///
/// Absolute and zoned instants render as UTC with a trailing `Z`; floating
/// and date-only values render as bare wall clocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRecord {
    pub title: String,
    pub description: Option<String>,
    pub start: String,
    pub end: String,
    pub all_day: bool,
}

/// One VCALENDAR block: its timezone table and events.
#[derive(Debug, Clone)]
pub struct Calendar {
    timezones: TimezoneTable,
    events: Vec<Event>,
    floating_zone: chrono_tz::Tz,
}

impl Calendar {
    /// Builds a calendar whose floating and date-only values read as UTC.
    pub fn from_ical(calendar: &IcalCalendar) -> FeedResult<Self> {
        Self::from_ical_in(calendar, chrono_tz::UTC)
    }

    /// Builds the timezone table first, then every event. Any invalid
    /// timezone or event fails the whole calendar.
    ///
    /// Floating and date-only values are read in `floating_zone`, including
    /// while event lengths and exclusions are worked out.
    pub fn from_ical_in(calendar: &IcalCalendar, floating_zone: chrono_tz::Tz) -> FeedResult<Self> {
        let timezones = TimezoneTable::from_ical(&calendar.timezones)?;
        let events = calendar
            .events
            .iter()
            .map(|event| Event::from_ical_in(event, &timezones, floating_zone))
            .collect::<FeedResult<Vec<_>>>()?;

        debug!(
            timezones = timezones.len(),
            events = events.len(),
            floating_zone = floating_zone.name(),
            "Parsed VCALENDAR"
        );
        Ok(Self {
            timezones,
            events,
            floating_zone,
        })
    }

    pub fn floating_zone(&self) -> chrono_tz::Tz {
        self.floating_zone
    }

    pub fn timezones(&self) -> &TimezoneTable {
        &self.timezones
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Converts a value of this calendar to an absolute instant.
    pub fn resolve(&self, time: &IcalTime) -> FeedResult<DateTime<Utc>> {
        self.timezones.resolve(time, &self.floating_zone)
    }

    /// Instances overlapping `[start, end]`.
    pub fn instances(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> FeedResult<Vec<EventInstance>> {
        let mut kept = Vec::new();
        for event in &self.events {
            for instance in event.instances_between(start, end, &self.timezones)? {
                let instance_start = self.resolve(&instance.start)?;
                let instance_end = self.resolve(&instance.end)?;
                if instance_start < end && instance_end > start {
                    kept.push(instance);
                }
            }
        }
        Ok(kept)
    }

    /// Instance records overlapping `[start, end]`.
    pub fn between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> FeedResult<Vec<InstanceRecord>> {
        self.instances(start, end)?
            .iter()
            .map(|instance| self.record(instance))
            .collect()
    }

    /// Absolute events overlapping `[start, end]`, for schedule building.
    pub fn schedule_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> FeedResult<Vec<ScheduleEvent>> {
        self.instances(start, end)?
            .into_iter()
            .map(|instance| {
                Ok(ScheduleEvent::new(
                    instance.title,
                    self.resolve(&instance.start)?,
                    self.resolve(&instance.end)?,
                ))
            })
            .collect()
    }

    fn record(&self, instance: &EventInstance) -> FeedResult<InstanceRecord> {
        Ok(InstanceRecord {
            title: instance.title.clone(),
            description: instance.description.clone(),
            start: self.render(&instance.start)?,
            end: self.render(&instance.end)?,
            all_day: instance.all_day,
        })
    }

    fn render(&self, time: &IcalTime) -> FeedResult<String> {
        Ok(match time {
            IcalTime::Utc(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
            IcalTime::Zoned { .. } => self
                .resolve(time)?
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            IcalTime::Floating(_) | IcalTime::Date(_) => {
                time.wall_clock().format(FLOATING_FORMAT).to_string()
            }
        })
    }
}

/// Every VCALENDAR of a document.
#[derive(Debug, Clone)]
pub struct CalendarSet {
    calendars: Vec<Calendar>,
}

impl CalendarSet {
    /// Sanitizes and parses `text` with default repairs.
    pub fn parse(text: &str) -> FeedResult<Self> {
        Self::parse_with(text, &SanitizeOptions::default())
    }

    /// Sanitizes and parses `text`, reading floating values as UTC.
    pub fn parse_with(text: &str, options: &SanitizeOptions) -> FeedResult<Self> {
        Self::parse_in(text, options, chrono_tz::UTC)
    }

    /// Sanitizes and parses `text`, reading floating and date-only values
    /// in `floating_zone`.
    pub fn parse_in(
        text: &str,
        options: &SanitizeOptions,
        floating_zone: chrono_tz::Tz,
    ) -> FeedResult<Self> {
        let calendars = sanitize(text, options)?
            .iter()
            .map(|calendar| Calendar::from_ical_in(calendar, floating_zone))
            .collect::<FeedResult<Vec<_>>>()?;
        Ok(Self { calendars })
    }

    pub fn calendars(&self) -> &[Calendar] {
        &self.calendars
    }

    pub fn len(&self) -> usize {
        self.calendars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calendars.is_empty()
    }

    /// Instance records of every calendar, in document order.
    pub fn between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> FeedResult<Vec<InstanceRecord>> {
        let mut records = Vec::new();
        for calendar in &self.calendars {
            records.extend(calendar.between(start, end)?);
        }
        Ok(records)
    }

    /// Absolute events of every calendar, in document order.
    pub fn schedule_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> FeedResult<Vec<ScheduleEvent>> {
        let mut events = Vec::new();
        for calendar in &self.calendars {
            events.extend(calendar.schedule_events(start, end)?);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedError;
    use crate::ics::tests::{EASTERN_VTIMEZONE, calendar_text};
    use chrono::TimeZone;
    use roomsign_core::build_schedule;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn document(events: &[&[&str]]) -> String {
        let mut lines: Vec<&str> = EASTERN_VTIMEZONE.to_vec();
        for event in events {
            lines.push("BEGIN:VEVENT");
            lines.extend_from_slice(event);
            lines.push("END:VEVENT");
        }
        calendar_text(&lines)
    }

    #[test]
    fn records_render_each_kind() {
        let text = document(&[
            &[
                "SUMMARY:Open",
                "DESCRIPTION:Front desk",
                "DTSTART;TZID=Eastern:20250205T090000",
                "DTEND;TZID=Eastern:20250205T120000",
            ],
            &[
                "SUMMARY:Open late",
                "DTSTART:20250205T200000Z",
                "DTEND:20250205T230000Z",
            ],
            &[
                "SUMMARY:Floating",
                "DTSTART:20250206T090000",
                "DURATION:PT30M",
            ],
            &[
                "SUMMARY:Holiday",
                "DTSTART;VALUE=DATE:20250207",
                "DTEND;VALUE=DATE:20250208",
            ],
        ]);
        let set = CalendarSet::parse(&text).unwrap();
        let records = set
            .between(utc(2025, 2, 5, 0, 0), utc(2025, 2, 12, 0, 0))
            .unwrap();
        insta::assert_json_snapshot!(records, @r#"
        [
          {
            "title": "Open",
            "description": "Front desk",
            "start": "2025-02-05T14:00:00.000Z",
            "end": "2025-02-05T17:00:00.000Z",
            "allDay": false
          },
          {
            "title": "Open late",
            "description": null,
            "start": "2025-02-05T20:00:00.000Z",
            "end": "2025-02-05T23:00:00.000Z",
            "allDay": false
          },
          {
            "title": "Floating",
            "description": null,
            "start": "2025-02-06T09:00:00.000",
            "end": "2025-02-06T09:30:00.000",
            "allDay": false
          },
          {
            "title": "Holiday",
            "description": null,
            "start": "2025-02-07T00:00:00.000",
            "end": "2025-02-08T00:00:00.000",
            "allDay": true
          }
        ]
        "#);
    }

    #[test]
    fn between_keeps_only_overlapping_instances() {
        let text = document(&[
            &["SUMMARY:Old", "DTSTART:20240101T090000Z", "DTEND:20240101T100000Z"],
            &["SUMMARY:Now", "DTSTART:20250206T090000Z", "DTEND:20250206T100000Z"],
        ]);
        let set = CalendarSet::parse(&text).unwrap();
        let records = set
            .between(utc(2025, 2, 5, 0, 0), utc(2025, 2, 12, 0, 0))
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Now");
    }

    #[test]
    fn one_bad_event_aborts_the_parse() {
        let text = document(&[
            &["SUMMARY:Good", "DTSTART:20250206T090000Z", "DTEND:20250206T100000Z"],
            &["SUMMARY:Bad", "DTSTART:20250206T090000Z"],
        ]);
        let err = CalendarSet::parse(&text).unwrap_err();
        assert!(matches!(err, FeedError::MissingEndSpecification { .. }));
    }

    #[test]
    fn unknown_tzid_fails_when_resolved() {
        let text = document(&[&[
            "SUMMARY:Open",
            "DTSTART;TZID=Nowhere:20250206T090000",
            "DTEND;TZID=Nowhere:20250206T100000",
        ]]);
        let set = CalendarSet::parse(&text).unwrap();
        let err = set
            .between(utc(2025, 2, 5, 0, 0), utc(2025, 2, 12, 0, 0))
            .unwrap_err();
        assert!(matches!(err, FeedError::UnknownTimezoneReference { .. }));
    }

    #[test]
    fn floating_zone_shifts_schedule_events() {
        let text = document(&[&[
            "SUMMARY:Open",
            "DTSTART:20250206T090000",
            "DTEND:20250206T170000",
        ]]);
        let set =
            CalendarSet::parse_in(&text, &SanitizeOptions::default(), chrono_tz::Europe::Paris)
                .unwrap();
        assert_eq!(set.calendars()[0].floating_zone(), chrono_tz::Europe::Paris);
        let events = set
            .schedule_events(utc(2025, 2, 5, 0, 0), utc(2025, 2, 12, 0, 0))
            .unwrap();
        assert_eq!(events[0].start, utc(2025, 2, 6, 8, 0));
        assert_eq!(events[0].end, utc(2025, 2, 6, 16, 0));
    }

    #[test]
    fn floating_end_after_zoned_start_uses_floating_zone() {
        let text = document(&[&[
            "SUMMARY:Open",
            "DTSTART;TZID=Eastern:20250205T090000",
            "DTEND:20250205T170000",
        ]]);
        let window = (utc(2025, 2, 5, 0, 0), utc(2025, 2, 12, 0, 0));

        let set =
            CalendarSet::parse_in(&text, &SanitizeOptions::default(), chrono_tz::America::New_York)
                .unwrap();
        let events = set.schedule_events(window.0, window.1).unwrap();
        assert_eq!(events[0].start, utc(2025, 2, 5, 14, 0));
        assert_eq!(events[0].end, utc(2025, 2, 5, 22, 0));

        let records = set.between(window.0, window.1).unwrap();
        assert_eq!(records[0].end, "2025-02-05T22:00:00.000Z");
    }

    #[test]
    fn recurring_feed_builds_weekly_schedule() {
        let text = document(&[
            &[
                "SUMMARY:Open hours",
                "DTSTART;TZID=Eastern:20250101T090000",
                "DTEND;TZID=Eastern:20250101T170000",
                "RRULE:FREQ=WEEKLY;BYDAY=MO,WE,FR",
                "EXDATE;TZID=Eastern:20250207T090000",
            ],
            &[
                "SUMMARY:Staff meeting",
                "DTSTART;TZID=Eastern:20250205T100000",
                "DTEND;TZID=Eastern:20250205T110000",
            ],
        ]);
        // Wednesday 2025-02-05 08:00 in Eastern time.
        let now = utc(2025, 2, 5, 13, 0).with_timezone(&chrono_tz::America::New_York);
        let set = CalendarSet::parse(&text).unwrap();
        let events = set
            .schedule_events(utc(2025, 2, 5, 5, 0), utc(2025, 2, 12, 5, 0))
            .unwrap();
        let schedule = build_schedule(&events, &now);

        let open_days: Vec<usize> = schedule
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.is_closed())
            .map(|(i, _)| i)
            .collect();
        // Wednesday and Monday; Friday is excluded.
        assert_eq!(open_days, vec![0, 5]);
        assert_eq!(schedule[0].ranges[0].start, utc(2025, 2, 5, 14, 0));
        assert_eq!(schedule[0].ranges[0].end, utc(2025, 2, 5, 22, 0));
    }

    #[test]
    fn empty_document_is_malformed() {
        let err = CalendarSet::parse("").unwrap_err();
        assert!(matches!(err, FeedError::MalformedCalendarDocument { .. }));
    }
}
