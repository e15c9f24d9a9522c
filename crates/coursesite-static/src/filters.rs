//! Template filters.
//!
//! Filters are pure: the same input always yields the same string, and none
//! of them fail. Bad input produces a sentinel value instead of an error.

use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use minijinja::value::{Value, ValueKind};
use regex::Regex;

/// Output of [`date_format`] for input that is not a date.
pub const INVALID_DATE: &str = "Invalid Date";

/// Reading speed used by [`reading_time`].
pub const WORDS_PER_MINUTE: usize = 200;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y", "%Y/%m/%d"];

/// Parse a date string in the host's local timezone.
///
/// Timestamps with an offset are converted to local time; timestamps without
/// one are taken as local time; bare dates are local midnight on that day.
pub fn parse_date(input: &str) -> Option<DateTime<Local>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Local));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt.with_timezone(&Local));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Local.from_local_datetime(&naive).earliest();
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(input, format) {
            return Local
                .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
                .earliest();
        }
    }

    None
}

/// Format a date string as `"Month Day, Year"` with English month names.
pub fn format_date(input: &str) -> String {
    match parse_date(input) {
        Some(date) => format_local(&date),
        None => INVALID_DATE.to_string(),
    }
}

fn format_local(date: &DateTime<Local>) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Estimated reading time of `text` as `"<N> min read"`.
///
/// Words are the pieces left after splitting on whitespace runs, so leading
/// or trailing whitespace adds an empty piece and `""` counts as one word.
pub fn reading_time(text: &str) -> String {
    let words = WHITESPACE.split(text).count();
    let minutes = words.div_ceil(WORDS_PER_MINUTE);
    format!("{} min read", minutes)
}

/// `dateFormat` template filter.
///
/// Accepts date strings and numbers (milliseconds since the Unix epoch).
pub fn date_format(value: Value) -> String {
    if let Some(s) = value.as_str() {
        return format_date(s);
    }

    if value.kind() != ValueKind::Number {
        return INVALID_DATE.to_string();
    }

    let millis = i64::try_from(value.clone())
        .ok()
        .or_else(|| {
            f64::try_from(value)
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| f as i64)
        });

    millis
        .and_then(|ms| Local.timestamp_millis_opt(ms).single())
        .map(|date| format_local(&date))
        .unwrap_or_else(|| INVALID_DATE.to_string())
}

/// `readingTime` template filter.
pub fn reading_time_filter(value: Value) -> String {
    match value.as_str() {
        Some(text) => reading_time(text),
        None => reading_time(&value.to_string()),
    }
}
