//! Feed parsing error types.

use thiserror::Error;

/// Result type for feed parsing operations.
pub type FeedResult<T> = Result<T, FeedError>;

/// Errors raised while parsing, expanding or resolving a calendar feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// A UTC offset did not match `[+-]HHMM[SS]` or was 24h or more.
    #[error("Malformed UTC offset: {value:?}")]
    MalformedOffset { value: String },

    /// No timezone transition applies to the instant.
    #[error("Cannot resolve {wall_clock} in timezone {tzid}: {reason}")]
    TimezoneResolution {
        tzid: String,
        wall_clock: String,
        reason: String,
    },

    /// The feed uses recurrence features that are not implemented (RDATE).
    #[error("Unsupported recurrence in {component}: {feature}")]
    UnsupportedRecurrence { component: String, feature: String },

    /// An event has neither DTEND nor DURATION.
    #[error("Event {title:?} has neither DTEND nor DURATION")]
    MissingEndSpecification { title: String },

    /// The document could not be tokenized as iCalendar.
    #[error("Malformed calendar document: {message}")]
    MalformedCalendarDocument { message: String },

    /// A TZID parameter names a timezone missing from the calendar.
    #[error("Unknown timezone reference: {tzid}")]
    UnknownTimezoneReference { tzid: String },

    /// A required property is absent.
    #[error("Missing {property} in {component}")]
    MissingProperty {
        component: String,
        property: String,
    },

    /// A DATE or DATE-TIME value could not be parsed.
    #[error("Invalid date-time {value:?}: {message}")]
    InvalidDateTime { value: String, message: String },

    /// A DURATION value could not be parsed.
    #[error("Invalid duration: {value:?}")]
    InvalidDuration { value: String },

    /// The recurrence rule was rejected by the rule engine.
    #[error("Invalid recurrence rule {rule:?}: {message}")]
    InvalidRecurrenceRule { rule: String, message: String },

    /// An IANA timezone name is not known.
    #[error("Invalid timezone name: {name}")]
    InvalidTimezoneName { name: String },

    /// The JSON event list could not be decoded.
    #[error("Invalid JSON feed: {0}")]
    Json(#[from] serde_json::Error),
}

impl FeedError {
    /// Creates a malformed offset error.
    pub fn malformed_offset(value: impl Into<String>) -> Self {
        Self::MalformedOffset {
            value: value.into(),
        }
    }

    /// Creates a timezone resolution error.
    pub fn timezone_resolution(
        tzid: impl Into<String>,
        wall_clock: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::TimezoneResolution {
            tzid: tzid.into(),
            wall_clock: wall_clock.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an unsupported recurrence error.
    pub fn unsupported_recurrence(component: impl Into<String>, feature: impl Into<String>) -> Self {
        Self::UnsupportedRecurrence {
            component: component.into(),
            feature: feature.into(),
        }
    }

    /// Creates a missing end specification error.
    pub fn missing_end(title: impl Into<String>) -> Self {
        Self::MissingEndSpecification {
            title: title.into(),
        }
    }

    /// Creates a malformed document error.
    pub fn malformed_document(message: impl Into<String>) -> Self {
        Self::MalformedCalendarDocument {
            message: message.into(),
        }
    }

    /// Creates an unknown timezone reference error.
    pub fn unknown_timezone(tzid: impl Into<String>) -> Self {
        Self::UnknownTimezoneReference { tzid: tzid.into() }
    }

    /// Creates a missing property error.
    pub fn missing_property(component: impl Into<String>, property: impl Into<String>) -> Self {
        Self::MissingProperty {
            component: component.into(),
            property: property.into(),
        }
    }

    /// Creates an invalid date-time error.
    pub fn invalid_datetime(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDateTime {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid duration error.
    pub fn invalid_duration(value: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.into(),
        }
    }

    /// Creates an invalid recurrence rule error.
    pub fn invalid_rule(rule: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidRecurrenceRule {
            rule: rule.into(),
            message: message.to_string(),
        }
    }

    /// Creates an invalid timezone name error.
    pub fn invalid_timezone_name(name: impl Into<String>) -> Self {
        Self::InvalidTimezoneName { name: name.into() }
    }
}
