//! DATE / DATE-TIME values with their timezone kind.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use ical::property::Property;

use super::param;
use crate::error::{FeedError, FeedResult};

const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";
const DATE_FORMAT: &str = "%Y%m%d";

/// A calendar instant together with how it should be interpreted.
///
/// Zoned values are only checked against the timezone table when they are
/// resolved, so an unknown `TZID` fails late with
/// [`FeedError::UnknownTimezoneReference`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IcalTime {
    /// An absolute instant (`...Z`).
    Utc(DateTime<Utc>),
    /// A wall clock in a timezone defined by a VTIMEZONE.
    Zoned {
        wall_clock: NaiveDateTime,
        tzid: String,
    },
    /// A wall clock without timezone, local to whoever reads it.
    Floating(NaiveDateTime),
    /// A whole day; the wall clock is midnight.
    Date(NaiveDate),
}

impl IcalTime {
    /// Parses the single value of a DTSTART/DTEND style property.
    pub fn from_property(prop: &Property) -> FeedResult<Self> {
        let value = prop
            .value
            .as_deref()
            .ok_or_else(|| FeedError::invalid_datetime("", format!("{} has no value", prop.name)))?;
        Self::parse(value, param(prop, "TZID"), is_date_valued(prop))
    }

    /// Parses every comma-separated value of a multi-valued property such
    /// as EXDATE.
    pub fn list_from_property(prop: &Property) -> FeedResult<Vec<Self>> {
        let Some(value) = prop.value.as_deref() else {
            return Ok(Vec::new());
        };
        let tzid = param(prop, "TZID");
        let date_only = is_date_valued(prop);
        value
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Self::parse(v, tzid, date_only))
            .collect()
    }

    /// Parses a raw value.
    ///
    /// A trailing `Z` wins over any `TZID`; eight-digit values are dates
    /// even without `VALUE=DATE`.
    pub fn parse(value: &str, tzid: Option<&str>, date_only: bool) -> FeedResult<Self> {
        let value = value.trim();
        if date_only || value.len() == 8 {
            let date_part = value.get(..8).unwrap_or(value);
            return NaiveDate::parse_from_str(date_part, DATE_FORMAT)
                .map(Self::Date)
                .map_err(|e| FeedError::invalid_datetime(value, e.to_string()));
        }

        if let Some(utc) = value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) {
            let naive = NaiveDateTime::parse_from_str(utc, DATE_TIME_FORMAT)
                .map_err(|e| FeedError::invalid_datetime(value, e.to_string()))?;
            return Ok(Self::Utc(naive.and_utc()));
        }

        let naive = NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT)
            .map_err(|e| FeedError::invalid_datetime(value, e.to_string()))?;
        Ok(match tzid {
            Some(tzid) if !tzid.is_empty() => Self::Zoned {
                wall_clock: naive,
                tzid: tzid.to_string(),
            },
            _ => Self::Floating(naive),
        })
    }

    /// The wall clock of the value (UTC clock for absolute values).
    pub fn wall_clock(&self) -> NaiveDateTime {
        match self {
            Self::Utc(dt) => dt.naive_utc(),
            Self::Zoned { wall_clock, .. } => *wall_clock,
            Self::Floating(naive) => *naive,
            Self::Date(date) => date.and_time(NaiveTime::MIN),
        }
    }

    /// Builds a value of the same kind at another wall clock.
    pub fn with_wall_clock(&self, wall_clock: NaiveDateTime) -> Self {
        match self {
            Self::Utc(_) => Self::Utc(wall_clock.and_utc()),
            Self::Zoned { tzid, .. } => Self::Zoned {
                wall_clock,
                tzid: tzid.clone(),
            },
            Self::Floating(_) => Self::Floating(wall_clock),
            Self::Date(_) => Self::Date(wall_clock.date()),
        }
    }

    /// Adds `delta` to the wall clock, keeping the kind.
    ///
    /// Dates stay dates when `delta` is a whole number of days and become
    /// floating wall clocks otherwise. Fails when the result leaves chrono's
    /// representable range.
    pub fn shifted(&self, delta: Duration) -> FeedResult<Self> {
        let out_of_range = || FeedError::invalid_datetime(self.to_string(), "shifted out of range");
        let wall_clock = self
            .wall_clock()
            .checked_add_signed(delta)
            .ok_or_else(out_of_range)?;
        Ok(match self {
            Self::Date(_) if delta.num_seconds() % 86_400 == 0 && delta.subsec_nanos() == 0 => {
                Self::Date(wall_clock.date())
            }
            Self::Date(_) => Self::Floating(wall_clock),
            _ => self.with_wall_clock(wall_clock),
        })
    }

    /// Returns true for whole-day values.
    pub fn is_date(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Returns the timezone identifier of zoned values.
    pub fn tzid(&self) -> Option<&str> {
        match self {
            Self::Zoned { tzid, .. } => Some(tzid),
            _ => None,
        }
    }

    /// Returns true when both wall clocks are read in the same frame, so
    /// they can be compared without resolution.
    pub fn same_frame(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Utc(_), Self::Utc(_)) => true,
            (Self::Zoned { tzid: a, .. }, Self::Zoned { tzid: b, .. }) => a == b,
            (Self::Floating(_) | Self::Date(_), Self::Floating(_) | Self::Date(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for IcalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utc(dt) => write!(f, "{}", dt.format("%Y%m%dT%H%M%SZ")),
            Self::Zoned { wall_clock, tzid } => {
                write!(f, "{} ({tzid})", wall_clock.format(DATE_TIME_FORMAT))
            }
            Self::Floating(naive) => write!(f, "{}", naive.format(DATE_TIME_FORMAT)),
            Self::Date(date) => write!(f, "{}", date.format(DATE_FORMAT)),
        }
    }
}

fn is_date_valued(prop: &Property) -> bool {
    param(prop, "VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE"))
}
