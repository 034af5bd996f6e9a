//! Field-level parsers for crime-incident exports.
//!
//! Dates in these exports are day-first (`01-03-2023` is 1 March 2023),
//! sometimes with a trailing `HH:MM` time. The time-of-occurrence column is
//! messier: full timestamps, bare clock times, and free text all appear, so
//! hours go through an explicit two-stage parser ([`parse_hour`]).

use chrono::{Datelike as _, NaiveDate, NaiveDateTime, NaiveTime, Timelike as _};

/// Earliest year accepted from a parsed date. `%Y` happily reads `23` as
/// year 23, so anything below this is treated as unparseable rather than
/// kept.
const MIN_YEAR: i32 = 1000;

/// Day-first date-only formats, tried in order. Two-digit years (`%y`)
/// come last so four-digit years never lose their century.
const DAY_FIRST_DATE_FORMATS: &[&str] = &[
    "%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y-%m-%d", "%d-%m-%y", "%d/%m/%y", "%d.%m.%y",
];

/// Timestamp formats (day-first, then ISO 8601).
const TIMESTAMP_FORMATS: &[&str] = &[
    "%d-%m-%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d-%m-%y %H:%M",
    "%d-%m-%y %H:%M:%S",
    "%d/%m/%y %H:%M",
    "%d/%m/%y %H:%M:%S",
];

/// Bare clock-time formats.
const CLOCK_FORMATS: &[&str] = &[
    "%H:%M:%S",
    "%H:%M",
    "%H:%M:%S%.f",
    "%I:%M %p",
    "%I:%M:%S %p",
    "%H%M",
];

/// Parses a day-first calendar date, ignoring any trailing time component.
#[must_use]
pub fn parse_day_first_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    DAY_FIRST_DATE_FORMATS
        .iter()
        .find_map(|fmt| {
            NaiveDate::parse_from_str(s, fmt)
                .ok()
                .filter(|date| date.year() >= MIN_YEAR)
        })
        .or_else(|| parse_timestamp(s).map(|dt| dt.date()))
}

/// Parses a full date-and-time value.
fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| {
            NaiveDateTime::parse_from_str(s, fmt)
                .ok()
                .filter(|dt| dt.year() >= MIN_YEAR)
        })
}

/// Which stage of [`parse_hour`] produced the hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourStage {
    /// Parsed as a timestamp or clock time.
    Timestamp,
    /// Recovered from the first numeric token after splitting on
    /// separators.
    SplitFallback,
}

/// Outcome of parsing an hour of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourParse {
    Parsed { hour: u8, stage: HourStage },
    Unparseable,
}

impl HourParse {
    /// The parsed hour, if any.
    #[must_use]
    pub const fn hour(self) -> Option<u8> {
        match self {
            Self::Parsed { hour, .. } => Some(hour),
            Self::Unparseable => None,
        }
    }
}

/// Extracts the hour of day from a time-of-occurrence value.
///
/// Stage one parses the value as a timestamp or clock time. Stage two
/// splits the raw text on every non-digit character and takes the first
/// numeric token, accepting it only if it is a valid hour (0-23). When
/// both fail the result is [`HourParse::Unparseable`]; zero is never
/// substituted.
#[must_use]
pub fn parse_hour(raw: &str) -> HourParse {
    let s = raw.trim();

    let timestamp_hour = parse_timestamp(s).map(|dt| dt.hour()).or_else(|| {
        CLOCK_FORMATS
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
            .map(|t| t.hour())
    });

    if let Some(hour) = timestamp_hour.and_then(|h| u8::try_from(h).ok()) {
        return HourParse::Parsed {
            hour,
            stage: HourStage::Timestamp,
        };
    }

    let first_token = s.split(|c: char| !c.is_ascii_digit()).find(|t| !t.is_empty());

    match first_token.and_then(|t| t.parse::<u8>().ok()) {
        Some(hour) if hour <= 23 => HourParse::Parsed {
            hour,
            stage: HourStage::SplitFallback,
        },
        _ => HourParse::Unparseable,
    }
}

/// Parses a non-negative whole number, accepting float renderings like
/// `"35.0"`. Fractional values are rounded to the nearest integer.
#[must_use]
pub fn parse_count(s: &str) -> Option<u32> {
    let value = s.trim().parse::<f64>().ok()?;
    if !value.is_finite() || value < 0.0 || value > f64::from(u32::MAX) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = value.round() as u32;
    Some(count)
}

/// Parses yes/no style flags.
#[must_use]
pub fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "t" | "1" | "closed" => Some(true),
        "no" | "n" | "false" | "f" | "0" | "open" => Some(false),
        _ => None,
    }
}

/// Median of observed counts, rounded to the nearest integer.
#[must_use]
pub fn median_count(values: &[u32]) -> Option<u32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        return Some(sorted[mid]);
    }
    let mean = (f64::from(sorted[mid - 1]) + f64::from(sorted[mid])) / 2.0;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let median = mean.round() as u32;
    Some(median)
}
