//! Calendar feed parsing for roomsign.
//!
//! Two feed formats are supported:
//!
//! - **iCalendar** ([`ics`]): VTIMEZONE definitions, RRULE/EXDATE expansion
//!   and repairs for non-conformant exports;
//! - **JSON** ([`api`]): Google-Calendar-style event lists.
//!
//! Both produce [`roomsign_core::ScheduleEvent`]s for the schedule builder.

pub mod api;
pub mod error;
pub mod ics;

pub use error::{FeedError, FeedResult};
pub use ics::{Calendar, CalendarSet, IcalTime, InstanceRecord, SanitizeOptions};
