//! Recurrence rule evaluation on wall-clock values.
//!
//! Rules are anchored at a `NaiveDateTime` and evaluated by the `rrule`
//! crate as if that wall clock were UTC. Callers convert occurrences back to
//! their own timezone semantics.

use chrono::{Duration, NaiveDateTime, TimeZone, Utc};
use rrule::RRuleSet;
use tracing::{trace, warn};

use crate::error::{FeedError, FeedResult};

/// Upper bound on occurrences produced by one query.
const OCCURRENCE_LIMIT: u16 = u16::MAX;

/// A recurrence rule compiled against its anchor.
#[derive(Debug, Clone)]
pub struct Rule {
    text: String,
    set: RRuleSet,
}

impl Rule {
    /// Compiles `rule` (an `RRULE` value, with or without the `RRULE:`
    /// prefix) anchored at `dtstart`.
    pub fn compile(dtstart: NaiveDateTime, rule: &str) -> FeedResult<Self> {
        let text = normalize_rule(rule);
        let source = format!(
            "DTSTART:{}Z\nRRULE:{}",
            dtstart.format("%Y%m%dT%H%M%S"),
            text
        );
        let set: RRuleSet = source
            .parse()
            .map_err(|e| FeedError::invalid_rule(text.clone(), e))?;
        trace!(rule = %text, %dtstart, "Compiled recurrence rule");
        Ok(Self { text, set })
    }

    /// Returns the normalized rule text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Occurrences within `[from, to]`, bounds included.
    ///
    /// The engine query is widened by a second on each side and the result
    /// trimmed back to `[from, to]`.
    pub fn between(&self, from: NaiveDateTime, to: NaiveDateTime) -> Vec<NaiveDateTime> {
        let tz: rrule::Tz = Utc.into();
        let after = tz.from_utc_datetime(&widen(from, -1));
        let before = tz.from_utc_datetime(&widen(to, 1));
        let mut dates = self.collect(self.set.clone().after(after).before(before));
        dates.retain(|d| *d >= from && *d <= to);
        dates
    }

    /// The latest occurrence at or before `bound`, if any.
    pub fn latest_at_or_before(&self, bound: NaiveDateTime) -> Option<NaiveDateTime> {
        let tz: rrule::Tz = Utc.into();
        let before = tz.from_utc_datetime(&widen(bound, 1));
        self.collect(self.set.clone().before(before))
            .into_iter()
            .rev()
            .find(|d| *d <= bound)
    }

    fn collect(&self, set: RRuleSet) -> Vec<NaiveDateTime> {
        let result = set.all(OCCURRENCE_LIMIT);
        if result.limited {
            warn!(rule = %self.text, "Recurrence expansion hit the occurrence limit");
        }
        result.dates.iter().map(|d| d.naive_utc()).collect()
    }
}

/// Moves `at` by `seconds`, staying put at the edge of chrono's range.
fn widen(at: NaiveDateTime, seconds: i64) -> NaiveDateTime {
    at.checked_add_signed(Duration::seconds(seconds))
        .unwrap_or(at)
}

/// Strips an `RRULE:` prefix and rewrites `UNTIL` to the UTC form the rule
/// engine requires for a UTC anchor.
fn normalize_rule(rule: &str) -> String {
    let body = rule.trim();
    let body = body
        .strip_prefix("RRULE:")
        .or_else(|| body.strip_prefix("rrule:"))
        .unwrap_or(body);

    body.split(';')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((key, value)) if key.eq_ignore_ascii_case("UNTIL") => {
                format!("UNTIL={}", normalize_until(value))
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn normalize_until(value: &str) -> String {
    let value = value.trim();
    match value.len() {
        8 => format!("{value}T235959Z"),
        15 => format!("{value}Z"),
        _ => value.to_string(),
    }
}
