//! `DURATION` value parsing (`P1W`, `PT1H30M`, `-P1DT12H`).

use std::sync::LazyLock;

use chrono::Duration;
use regex::Regex;

use crate::error::{FeedError, FeedResult};

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-])?P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
        .expect("Invalid duration regex")
});

/// Parses an iCalendar duration into a signed [`Duration`].
pub fn parse_duration(value: &str) -> FeedResult<Duration> {
    let trimmed = value.trim().to_ascii_uppercase();
    let caps = DURATION_RE
        .captures(&trimmed)
        .ok_or_else(|| FeedError::invalid_duration(value))?;

    // "P" and "PT" alone match the pattern but carry no component.
    if (2..=6).all(|i| caps.get(i).is_none()) {
        return Err(FeedError::invalid_duration(value));
    }

    let field = |i: usize| -> FeedResult<i64> {
        caps.get(i)
            .map_or(Ok(0), |m| m.as_str().parse::<i64>())
            .map_err(|_| FeedError::invalid_duration(value))
    };

    let units = [(2, 7 * 86_400), (3, 86_400), (4, 3_600), (5, 60), (6, 1)];
    let seconds = units.into_iter().try_fold(0i64, |total, (i, unit)| {
        field(i)?
            .checked_mul(unit)
            .and_then(|part| total.checked_add(part))
            .ok_or_else(|| FeedError::invalid_duration(value))
    })?;
    let duration =
        Duration::try_seconds(seconds).ok_or_else(|| FeedError::invalid_duration(value))?;

    if caps.get(1).is_some_and(|m| m.as_str() == "-") {
        Ok(-duration)
    } else {
        Ok(duration)
    }
}
