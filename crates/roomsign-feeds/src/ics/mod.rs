//! iCalendar feeds.
//!
//! Documents are tokenized by the `ical` crate, repaired by [`sanitize`],
//! then turned into [`Calendar`]s whose events expand into instances within
//! a query window:
//!
//! ```text
//! text ─▶ sanitize ─▶ IcalCalendar ─▶ Calendar { TimezoneTable, [Event] }
//!                                          │
//!                   [InstanceRecord] ◀── between(start, end) ──▶ [ScheduleEvent]
//! ```

pub mod calendar;
pub mod datetime;
pub mod duration;
pub mod event;
pub mod offset;
pub mod rule;
pub mod sanitize;
pub mod timezone;

use ical::property::Property;

pub use calendar::{Calendar, CalendarSet, InstanceRecord};
pub use datetime::IcalTime;
pub use duration::parse_duration;
pub use event::{Event, EventEnd, EventInstance, RecurrenceSet};
pub use offset::{format_offset, parse_offset};
pub use sanitize::{SanitizeOptions, sanitize};
pub use timezone::{Timezone, TimezoneTable, Transition, TransitionKind};

/// First property named `name`, ignoring case.
pub(crate) fn find_property<'a>(props: &'a [Property], name: &str) -> Option<&'a Property> {
    props.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Every property named `name`, ignoring case.
pub(crate) fn find_properties<'a>(
    props: &'a [Property],
    name: &'a str,
) -> impl Iterator<Item = &'a Property> + 'a {
    props.iter().filter(move |p| p.name.eq_ignore_ascii_case(name))
}

pub(crate) fn has_property(props: &[Property], name: &str) -> bool {
    find_property(props, name).is_some()
}

/// First value of parameter `name`, ignoring case.
pub(crate) fn param<'a>(prop: &'a Property, name: &str) -> Option<&'a str> {
    prop.params
        .as_ref()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .map(String::as_str)
}
