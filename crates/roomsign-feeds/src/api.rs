//! Google-Calendar-style JSON event lists.
//!
//! Accepts either a bare array of events or an `events.list` response with
//! an `items` array, and converts each event to a [`ScheduleEvent`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use roomsign_core::ScheduleEvent;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{FeedError, FeedResult};
use crate::ics::timezone::resolve_floating;

/// Either form of event list the calendar API returns.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EventList {
    Bare(Vec<ApiEvent>),
    Response {
        #[serde(default)]
        items: Vec<ApiEvent>,
    },
}

/// A single event from the calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    summary: Option<String>,
    status: Option<String>,
    start: Option<ApiEventTime>,
    end: Option<ApiEventTime>,
}

/// Event time from the API.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEventTime {
    pub date: Option<String>,
    pub date_time: Option<String>,
    pub time_zone: Option<String>,
}

impl ApiEventTime {
    /// Converts the time to an absolute instant.
    ///
    /// - `dateTime` with an offset is absolute;
    /// - `dateTime` without one is read in `timeZone`, else `fallback`;
    /// - `date` is midnight in `fallback`.
    ///
    /// A time with neither field is `now`.
    pub fn resolve(&self, fallback: &chrono_tz::Tz, now: DateTime<Utc>) -> FeedResult<DateTime<Utc>> {
        if let Some(value) = &self.date_time {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
                return Ok(parsed.with_timezone(&Utc));
            }
            let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .map_err(|e| FeedError::invalid_datetime(value, e.to_string()))?;
            let zone = match &self.time_zone {
                Some(name) => name
                    .parse::<chrono_tz::Tz>()
                    .map_err(|_| FeedError::invalid_timezone_name(name))?,
                None => *fallback,
            };
            return resolve_floating(naive, &zone);
        }

        if let Some(value) = &self.date {
            let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map_err(|e| FeedError::invalid_datetime(value, e.to_string()))?;
            return resolve_floating(date.and_time(NaiveTime::MIN), fallback);
        }

        warn!("Event time has neither dateTime nor date, using now");
        Ok(now)
    }
}

/// Parses a JSON event list into schedule events.
///
/// Cancelled events are skipped. Missing start or end times fall back to
/// `now`.
pub fn parse_events(
    json: &str,
    fallback: &chrono_tz::Tz,
    now: DateTime<Utc>,
) -> FeedResult<Vec<ScheduleEvent>> {
    let events = match serde_json::from_str::<EventList>(json)? {
        EventList::Bare(events) | EventList::Response { items: events } => events,
    };

    let mut converted = Vec::with_capacity(events.len());
    for event in events {
        if event.status.as_deref() == Some("cancelled") {
            continue;
        }
        let start = event.start.unwrap_or_default().resolve(fallback, now)?;
        let end = event.end.unwrap_or_default().resolve(fallback, now)?;
        converted.push(ScheduleEvent::new(
            event.summary.unwrap_or_default(),
            start,
            end,
        ));
    }

    debug!(events = converted.len(), "Parsed JSON event list");
    Ok(converted)
}
