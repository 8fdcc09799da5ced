//! Repairs for calendar feeds that do not follow RFC 5545 closely.
//!
//! Feeds exported by some providers spell component delimiters, property
//! names and parameter names in lower case, quote parameter values that the
//! parsers here compare verbatim, use non-standard parameter names, or omit
//! SUMMARY. [`sanitize`] tokenizes the document and rewrites these into the
//! canonical form the rest of the crate expects.

use std::collections::HashMap;

use ical::parser::ical::component::IcalCalendar;
use ical::property::Property;
use tracing::{debug, warn};

use super::has_property;
use crate::error::{FeedError, FeedResult};

/// What [`sanitize`] rewrites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeOptions {
    /// Non-standard parameter names (upper case) and their standard names.
    pub parameter_aliases: HashMap<String, String>,
    /// Summary injected into events that have none.
    pub default_summary: String,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            parameter_aliases: HashMap::from([("TZ".to_string(), "TZID".to_string())]),
            default_summary: String::new(),
        }
    }
}

impl SanitizeOptions {
    /// Adds a parameter alias, matched case-insensitively.
    #[must_use]
    pub fn with_alias(mut self, from: impl AsRef<str>, to: impl AsRef<str>) -> Self {
        self.parameter_aliases.insert(
            from.as_ref().to_ascii_uppercase(),
            to.as_ref().to_ascii_uppercase(),
        );
        self
    }

    /// Sets the summary injected into events without one.
    #[must_use]
    pub fn with_default_summary(mut self, summary: impl Into<String>) -> Self {
        self.default_summary = summary.into();
        self
    }
}

#[derive(Debug, Default)]
struct Repairs {
    lines: usize,
    properties: usize,
    parameters: usize,
    summaries: usize,
}

impl Repairs {
    fn total(&self) -> usize {
        self.lines + self.properties + self.parameters + self.summaries
    }
}

/// Tokenizes `text` and returns every VCALENDAR block, repaired.
///
/// # Errors
///
/// [`FeedError::MalformedCalendarDocument`] when the tokenizer fails or the
/// document holds no VCALENDAR at all.
pub fn sanitize(text: &str, options: &SanitizeOptions) -> FeedResult<Vec<IcalCalendar>> {
    let mut repairs = Repairs::default();
    let normalized = normalize_lines(text, &mut repairs);

    let mut calendars = ical::IcalParser::new(normalized.as_bytes())
        .collect::<Result<Vec<IcalCalendar>, _>>()
        .map_err(|e| FeedError::malformed_document(e.to_string()))?;

    if calendars.is_empty() {
        return Err(FeedError::malformed_document("no VCALENDAR block found"));
    }

    for calendar in &mut calendars {
        repair_calendar(calendar, options, &mut repairs);
    }

    if repairs.total() > 0 {
        warn!(
            lines = repairs.lines,
            properties = repairs.properties,
            parameters = repairs.parameters,
            summaries = repairs.summaries,
            "Repaired non-conformant calendar input"
        );
    }
    debug!(calendars = calendars.len(), "Tokenized calendar document");
    Ok(calendars)
}

/// Drops blank lines and upper-cases BEGIN/END delimiters, which the
/// tokenizer matches case-sensitively.
fn normalize_lines(text: &str, repairs: &mut Repairs) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut out = String::with_capacity(text.len() + 64);
    for line in text.lines() {
        if line.trim().is_empty() {
            repairs.lines += 1;
            continue;
        }
        let is_delimiter = line
            .split_once(':')
            .is_some_and(|(name, _)| {
                name.eq_ignore_ascii_case("BEGIN") || name.eq_ignore_ascii_case("END")
            });
        if is_delimiter && line != line.to_ascii_uppercase() {
            repairs.lines += 1;
            out.push_str(&line.trim_end().to_ascii_uppercase());
        } else {
            out.push_str(line);
        }
        out.push_str("\r\n");
    }
    out
}

fn repair_calendar(calendar: &mut IcalCalendar, options: &SanitizeOptions, repairs: &mut Repairs) {
    repair_properties(&mut calendar.properties, options, repairs);
    for zone in &mut calendar.timezones {
        repair_properties(&mut zone.properties, options, repairs);
        for transition in &mut zone.transitions {
            repair_properties(&mut transition.properties, options, repairs);
        }
    }
    for event in &mut calendar.events {
        repair_properties(&mut event.properties, options, repairs);
        if !has_property(&event.properties, "SUMMARY") {
            repairs.summaries += 1;
            event.properties.push(Property {
                name: "SUMMARY".to_string(),
                params: None,
                value: Some(options.default_summary.clone()),
            });
        }
    }
}

fn repair_properties(props: &mut [Property], options: &SanitizeOptions, repairs: &mut Repairs) {
    for prop in props {
        let name = prop.name.to_ascii_uppercase();
        if name != prop.name {
            repairs.properties += 1;
            prop.name = name;
        }

        let Some(params) = prop.params.as_mut() else {
            continue;
        };
        for (key, values) in params.iter_mut() {
            let upper = key.to_ascii_uppercase();
            let canonical = options
                .parameter_aliases
                .get(&upper)
                .cloned()
                .unwrap_or(upper);
            if canonical != *key {
                repairs.parameters += 1;
                *key = canonical;
            }
            for value in values.iter_mut() {
                if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
                    repairs.parameters += 1;
                    *value = value[1..value.len() - 1].to_string();
                }
            }
        }
    }
}
