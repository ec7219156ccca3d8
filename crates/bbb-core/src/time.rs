//! Timestamp parsing for response fields.
//!
//! Servers from 0.8 on report times as milliseconds since the Unix epoch.
//! Older servers emit human-readable strings in the style of the Unix `date`
//! command (`Thu Sep 01 17:51:42 UTC 2011`). Both end up as a
//! [`DateTime<Utc>`].

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, warn};

/// Converts milliseconds since the Unix epoch into an instant.
///
/// Zero is how servers say "never", so it maps to `None`, as do values out of
/// chrono's range.
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    if millis == 0 {
        return None;
    }
    DateTime::from_timestamp_millis(millis)
}

/// Parses a timestamp as found in a response field.
///
/// - empty strings and `null` (any case) give `None`;
/// - all-digit strings are epoch milliseconds;
/// - anything else goes through [`parse_legacy`].
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return None;
    }
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return match raw.parse::<i64>() {
            Ok(millis) => from_epoch_millis(millis),
            Err(_) => {
                warn!(value = %raw, "epoch timestamp out of range");
                None
            }
        };
    }
    let parsed = parse_legacy(raw);
    if parsed.is_none() {
        warn!(value = %raw, "unrecognized timestamp format");
    }
    parsed
}

/// Parses the free-form timestamps emitted by legacy servers.
///
/// Accepted shapes, in order: RFC 3339, RFC 2822,
/// `2011-09-05 17:32:57 -0300`, Unix `date` output
/// (`Thu Sep 01 17:51:42 EST 2011`), `2011-09-05 17:32:57`, `2011-09-05`
/// and a bare `Thu Sep 08`, which falls in the current year.
/// Zone-less values are taken as UTC; an unknown zone abbreviation makes the
/// value unparseable.
pub fn parse_legacy(raw: &str) -> Option<DateTime<Utc>> {
    parse_legacy_in_year(raw, Utc::now().year())
}

fn parse_legacy_in_year(raw: &str, current_year: i32) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    let parts: Vec<&str> = raw.split_whitespace().collect();
    match parts.as_slice() {
        [_weekday, month, day, time, zone, year] => parse_unix_date(month, day, time, zone, year),
        [_weekday, month, day] => {
            let date = NaiveDate::parse_from_str(
                &format!("{} {} {}", month, day, current_year),
                "%b %d %Y",
            )
            .ok()?;
            date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
        }
        _ => None,
    }
}

/// `Thu Sep 01 17:51:42 EST 2011` without its weekday, which is not checked
/// against the date.
fn parse_unix_date(
    month: &str,
    day: &str,
    time: &str,
    zone: &str,
    year: &str,
) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(
        &format!("{} {} {} {}", month, day, year, time),
        "%b %d %Y %H:%M:%S",
    )
    .ok()?;

    let offset_secs = match zone_offset_secs(zone) {
        Some(secs) => secs,
        None => {
            let with_offset = format!("{} {}", naive.format("%Y-%m-%d %H:%M:%S"), zone);
            return match DateTime::parse_from_str(&with_offset, "%Y-%m-%d %H:%M:%S %z") {
                Ok(dt) => Some(dt.with_timezone(&Utc)),
                Err(_) => {
                    debug!(zone = %zone, "unknown zone abbreviation");
                    None
                }
            };
        }
    };
    let offset = FixedOffset::east_opt(offset_secs)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// UTC offset, in seconds, of the zone abbreviations `date` prints on the
/// servers seen in the wild.
fn zone_offset_secs(zone: &str) -> Option<i32> {
    const HOUR: i32 = 3600;
    let offset = match zone.to_ascii_uppercase().as_str() {
        "UTC" | "UT" | "GMT" | "Z" | "WET" => 0,
        "BST" | "CET" | "WEST" => HOUR,
        "CEST" | "EET" | "SAST" => 2 * HOUR,
        "EEST" | "MSK" => 3 * HOUR,
        "IST" => 5 * HOUR + 30 * 60,
        "AWST" | "HKT" | "SGT" => 8 * HOUR,
        "JST" | "KST" => 9 * HOUR,
        "ACST" => 9 * HOUR + 30 * 60,
        "AEST" => 10 * HOUR,
        "AEDT" => 11 * HOUR,
        "NZST" => 12 * HOUR,
        "NZDT" => 13 * HOUR,
        "BRST" => -2 * HOUR,
        "BRT" | "ART" | "ADT" => -3 * HOUR,
        "AST" | "EDT" => -4 * HOUR,
        "EST" | "CDT" => -5 * HOUR,
        "CST" | "MDT" => -6 * HOUR,
        "MST" | "PDT" => -7 * HOUR,
        "PST" | "AKDT" => -8 * HOUR,
        "AKST" => -9 * HOUR,
        "HST" => -10 * HOUR,
        _ => return None,
    };
    Some(offset)
}
