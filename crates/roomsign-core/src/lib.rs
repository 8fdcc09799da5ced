//! Core types: schedule ranges, weekly availability, room status, formatting

pub mod event;
pub mod format;
pub mod schedule;
pub mod status;
pub mod time;
pub mod tracing;

pub use event::ScheduleEvent;
pub use format::{FormatOptions, ScheduleRanges, TimeFormat, format_schedule};
pub use schedule::{DEFAULT_OPEN_KEYWORD, SCHEDULE_DAYS, ScheduleBuilder, build_schedule, merge_ranges};
pub use status::{RoomStatus, room_status, room_status_with};
pub use time::{DateRange, DaySchedule, end_of_day, start_of_day};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
