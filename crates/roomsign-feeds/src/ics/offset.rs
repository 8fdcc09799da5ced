//! UTC offset codec for `TZOFFSETFROM` / `TZOFFSETTO` values.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{FeedError, FeedResult};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

static OFFSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-])?(\d{2})(\d{2})(\d{2})?$").expect("offset regex is valid")
});

/// Decodes `[+-]HHMM[SS]` into signed milliseconds.
///
/// A missing sign reads as positive. Offsets of 24 hours or more are
/// rejected.
pub fn parse_offset(value: &str) -> FeedResult<i64> {
    let trimmed = value.trim();
    let caps = OFFSET_RE
        .captures(trimmed)
        .ok_or_else(|| FeedError::malformed_offset(value))?;

    let field = |i: usize| -> i64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    let sign = if caps.get(1).is_some_and(|m| m.as_str() == "-") {
        -1
    } else {
        1
    };
    let (hours, minutes, seconds) = (field(2), field(3), field(4));
    if minutes >= 60 || seconds >= 60 {
        return Err(FeedError::malformed_offset(value));
    }

    let millis = sign * ((hours * 60 + minutes) * 60 + seconds) * 1000;
    if millis.abs() >= MILLIS_PER_DAY {
        return Err(FeedError::malformed_offset(value));
    }
    Ok(millis)
}

/// Encodes milliseconds back to `±HHMM`, appending seconds when non-zero.
pub fn format_offset(millis: i64) -> String {
    let sign = if millis < 0 { '-' } else { '+' };
    let total = millis.abs() / 1000;
    let (hours, minutes, seconds) = (total / 3600, (total / 60) % 60, total % 60);
    if seconds == 0 {
        format!("{sign}{hours:02}{minutes:02}")
    } else {
        format!("{sign}{hours:02}{minutes:02}{seconds:02}")
    }
}
