//! VTIMEZONE definitions and wall-clock resolution.
//!
//! A [`Timezone`] is the set of STANDARD and DAYLIGHT transitions declared
//! by the feed. Resolving a wall clock picks the transition whose latest
//! onset at or before that wall clock is the most recent, then subtracts its
//! `TZOFFSETTO`. All arithmetic happens on naive wall clocks.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use ical::parser::ical::component::{
    IcalTimeZone, IcalTimeZoneTransition, IcalTimeZoneTransitionType,
};
use ical::property::Property;
use tracing::{debug, trace};

use super::datetime::IcalTime;
use super::offset::{format_offset, parse_offset};
use super::rule::Rule;
use super::{find_property, has_property};
use crate::error::{FeedError, FeedResult};

/// Whether a transition enters standard or daylight time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Standard,
    Daylight,
}

impl TransitionKind {
    fn component(self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Daylight => "DAYLIGHT",
        }
    }
}

/// One STANDARD or DAYLIGHT block of a VTIMEZONE.
#[derive(Debug, Clone)]
pub struct Transition {
    pub kind: TransitionKind,
    /// Offset in effect before the onset, in milliseconds.
    pub offset_from: i64,
    /// Offset in effect after the onset, in milliseconds.
    pub offset_to: i64,
    /// First onset, as a wall clock.
    pub start: NaiveDateTime,
    /// Repetition of the onset; `None` means it happened once at `start`.
    pub rule: Option<Rule>,
}

impl Transition {
    /// Builds a transition from a parsed STANDARD/DAYLIGHT block.
    pub fn from_ical(block: &IcalTimeZoneTransition) -> FeedResult<Self> {
        let kind = match block.transition {
            IcalTimeZoneTransitionType::STANDARD => TransitionKind::Standard,
            IcalTimeZoneTransitionType::DAYLIGHT => TransitionKind::Daylight,
        };
        let component = kind.component();
        let props = &block.properties;

        if has_property(props, "RDATE") {
            return Err(FeedError::unsupported_recurrence(component, "RDATE"));
        }

        let offset_from = parse_offset(required_value(props, component, "TZOFFSETFROM")?)?;
        let offset_to = parse_offset(required_value(props, component, "TZOFFSETTO")?)?;
        let start = find_property(props, "DTSTART")
            .ok_or_else(|| FeedError::missing_property(component, "DTSTART"))
            .and_then(IcalTime::from_property)?
            .wall_clock();
        let rule = find_property(props, "RRULE")
            .and_then(|p| p.value.as_deref())
            .map(|r| Rule::compile(start, r))
            .transpose()?;

        Ok(Self {
            kind,
            offset_from,
            offset_to,
            start,
            rule,
        })
    }

    /// The latest onset at or before `wall_clock`, inclusive.
    pub fn latest_onset_at_or_before(&self, wall_clock: NaiveDateTime) -> Option<NaiveDateTime> {
        match &self.rule {
            Some(rule) => rule.latest_at_or_before(wall_clock),
            None => (self.start <= wall_clock).then_some(self.start),
        }
    }
}

fn required_value<'a>(props: &'a [Property], component: &str, name: &str) -> FeedResult<&'a str> {
    find_property(props, name)
        .and_then(|p| p.value.as_deref())
        .ok_or_else(|| FeedError::missing_property(component, name))
}

/// A timezone defined by a VTIMEZONE block.
#[derive(Debug, Clone)]
pub struct Timezone {
    pub tzid: String,
    pub standard: Vec<Transition>,
    pub daylight: Vec<Transition>,
}

impl Timezone {
    /// Builds a timezone from a parsed VTIMEZONE.
    pub fn from_ical(zone: &IcalTimeZone) -> FeedResult<Self> {
        let tzid = find_property(&zone.properties, "TZID")
            .and_then(|p| p.value.clone())
            .ok_or_else(|| FeedError::missing_property("VTIMEZONE", "TZID"))?;

        let mut standard = Vec::new();
        let mut daylight = Vec::new();
        for block in &zone.transitions {
            let transition = Transition::from_ical(block)?;
            match transition.kind {
                TransitionKind::Standard => standard.push(transition),
                TransitionKind::Daylight => daylight.push(transition),
            }
        }

        trace!(
            %tzid,
            standard = standard.len(),
            daylight = daylight.len(),
            "Parsed VTIMEZONE"
        );
        Ok(Self {
            tzid,
            standard,
            daylight,
        })
    }

    /// The transition in effect at `wall_clock`.
    ///
    /// Standard transitions are scanned before daylight ones and a later
    /// candidate only replaces the current one when its onset is strictly
    /// more recent, so on equal onsets the first declared transition wins.
    pub fn active_transition(&self, wall_clock: NaiveDateTime) -> FeedResult<&Transition> {
        if self.standard.is_empty() && self.daylight.is_empty() {
            return Err(FeedError::timezone_resolution(
                &self.tzid,
                wall_clock,
                "timezone declares no transitions",
            ));
        }

        let mut best: Option<(NaiveDateTime, &Transition)> = None;
        for transition in self.standard.iter().chain(&self.daylight) {
            let Some(onset) = transition.latest_onset_at_or_before(wall_clock) else {
                continue;
            };
            if best.is_none_or(|(current, _)| onset > current) {
                best = Some((onset, transition));
            }
        }

        best.map(|(_, t)| t).ok_or_else(|| {
            FeedError::timezone_resolution(&self.tzid, wall_clock, "no transition has begun yet")
        })
    }

    /// The UTC offset in effect at `wall_clock`, in milliseconds.
    pub fn offset_at(&self, wall_clock: NaiveDateTime) -> FeedResult<i64> {
        Ok(self.active_transition(wall_clock)?.offset_to)
    }

    /// Converts a wall clock of this zone to UTC.
    pub fn resolve(&self, wall_clock: NaiveDateTime) -> FeedResult<DateTime<Utc>> {
        let offset = self.offset_at(wall_clock)?;
        trace!(tzid = %self.tzid, %wall_clock, offset = %format_offset(offset), "Resolved wall clock");
        Ok((wall_clock - Duration::milliseconds(offset)).and_utc())
    }
}

/// Timezones of one calendar, keyed by `TZID`.
#[derive(Debug, Clone, Default)]
pub struct TimezoneTable {
    zones: HashMap<String, Timezone>,
}

impl TimezoneTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table from every VTIMEZONE of a calendar.
    pub fn from_ical(zones: &[IcalTimeZone]) -> FeedResult<Self> {
        let mut table = Self::new();
        for zone in zones {
            table.insert(Timezone::from_ical(zone)?);
        }
        Ok(table)
    }

    /// Adds a timezone; a duplicate `TZID` replaces the earlier definition.
    pub fn insert(&mut self, zone: Timezone) {
        if let Some(previous) = self.zones.insert(zone.tzid.clone(), zone) {
            debug!(tzid = %previous.tzid, "Duplicate VTIMEZONE replaced");
        }
    }

    pub fn get(&self, tzid: &str) -> Option<&Timezone> {
        self.zones.get(tzid)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Converts any calendar value to an absolute instant.
    ///
    /// Floating and date-only values are read in `floating`.
    pub fn resolve(&self, time: &IcalTime, floating: &chrono_tz::Tz) -> FeedResult<DateTime<Utc>> {
        match time {
            IcalTime::Utc(dt) => Ok(*dt),
            IcalTime::Zoned { wall_clock, tzid } => self
                .get(tzid)
                .ok_or_else(|| FeedError::unknown_timezone(tzid))?
                .resolve(*wall_clock),
            IcalTime::Floating(_) | IcalTime::Date(_) => {
                resolve_floating(time.wall_clock(), floating)
            }
        }
    }
}

/// Reads a wall clock in an IANA zone. Wall clocks inside a DST gap move
/// forward by an hour.
pub(crate) fn resolve_floating(
    wall_clock: NaiveDateTime,
    tz: &chrono_tz::Tz,
) -> FeedResult<DateTime<Utc>> {
    tz.from_local_datetime(&wall_clock)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(wall_clock + Duration::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| FeedError::timezone_resolution(tz.name(), wall_clock, "no such local time"))
}
