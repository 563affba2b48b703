//! Month/year argument normalization and activity timestamp parsing.

use crate::RunkeeperError;
use chrono::{Datelike, NaiveDateTime};

/// Normalize a month argument to the title-case three-letter abbreviation the
/// listing endpoint keys on ("jan" -> "Jan", "September" -> "Sep").
pub fn normalize_month(month: &str) -> Option<String> {
    let parsed: chrono::Month = month.trim().parse().ok()?;
    Some(parsed.name()[..3].to_string())
}

/// Validate a four-digit year, or default to the current local year.
pub fn resolve_year(year: Option<&str>) -> Option<String> {
    match year {
        None => Some(chrono::Local::now().year().to_string()),
        Some(y) => {
            let y = y.trim();
            (y.len() == 4 && y.bytes().all(|b| b.is_ascii_digit())).then(|| y.to_string())
        }
    }
}

/// `startDate` query value for a month listing, e.g. `Jan-01-2024`.
pub fn listing_start_date(month: &str, year: &str) -> String {
    format!("{month}-01-{year}")
}

/// Parse subtitle text shaped like `Mon Jan 05 14:30:00 UTC 2024`.
///
/// The weekday and zone tokens must be present but are discarded: the
/// result is the naive wall-clock time shown on the page, and the weekday is
/// not checked against the date.
pub fn parse_activity_timestamp(text: &str) -> Result<NaiveDateTime, RunkeeperError> {
    let malformed = |reason: &str| RunkeeperError::TimestampParse(format!("{text:?}: {reason}"));

    let tokens: Vec<&str> = text.split_whitespace().collect();
    let [weekday, month, day, time, zone, year] = tokens.as_slice() else {
        return Err(malformed("expected 6 fields"));
    };
    if weekday.parse::<chrono::Weekday>().is_err() {
        return Err(malformed("unknown weekday"));
    }
    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(malformed("unknown time zone"));
    }

    let kept = format!("{month} {day} {time} {year}");
    NaiveDateTime::parse_from_str(&kept, "%b %d %H:%M:%S %Y")
        .map_err(|e| malformed(&e.to_string()))
}
