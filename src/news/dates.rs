//! Best-effort publication date parsing.
//!
//! Feeds in the wild disagree on date formats. Each format is a separate
//! attempt, tried in a fixed order; the first one that parses wins. The
//! order is a tie-break policy and must not be rearranged.

use chrono::{DateTime, NaiveDateTime, Weekday};

type Attempt = fn(&str) -> Option<i64>;

/// Parse attempts in priority order.
const ATTEMPTS: &[(&str, Attempt)] = &[
    ("rfc822", parse_rfc822),
    ("iso8601-offset", parse_iso_offset),
    ("iso8601-zulu", parse_iso_zulu),
];

/// Converts a feed date string to epoch seconds.
///
/// Returns 0 when no known format matches. Callers keep such items and
/// they sort after everything with a real date.
pub fn parse_timestamp(raw: &str) -> i64 {
    let text = raw.trim();
    if text.is_empty() {
        return 0;
    }

    for (name, attempt) in ATTEMPTS {
        if let Some(ts) = attempt(text) {
            tracing::trace!(format = *name, ts, "parsed feed date");
            return ts;
        }
    }

    tracing::trace!(date = %text, "unrecognized feed date format");
    0
}

/// `Tue, 14 Nov 2023 10:00:00 +0000`, or with `Z` in place of the offset.
///
/// The weekday must be a three-letter abbreviation but is not checked
/// against the date itself; plenty of feeds get it wrong.
fn parse_rfc822(text: &str) -> Option<i64> {
    let (weekday, rest) = text.split_once(',')?;
    let weekday = weekday.trim();
    if weekday.len() != 3 {
        return None;
    }
    weekday.parse::<Weekday>().ok()?;

    let rest = rest.trim_start();
    if let Some(naive) = rest.strip_suffix('Z') {
        return NaiveDateTime::parse_from_str(naive.trim_end(), "%d %b %Y %H:%M:%S")
            .ok()
            .map(|dt| dt.and_utc().timestamp());
    }

    DateTime::parse_from_str(rest, "%d %b %Y %H:%M:%S %z")
        .ok()
        .map(|dt| dt.timestamp())
}

/// `2023-11-14T10:00:00+00:00` or `2023-11-14T10:00:00+0000`
fn parse_iso_offset(text: &str) -> Option<i64> {
    DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%z")
        .ok()
        .map(|dt| dt.timestamp())
}

/// `2023-11-14T10:00:00Z`, read as UTC.
fn parse_iso_zulu(text: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%SZ")
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}
