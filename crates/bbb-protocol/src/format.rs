//! Value formatting for decoded responses.
//!
//! The codec leaves every leaf as a string. A [`Formatter`] coerces the
//! fields a caller knows about into typed [`Value`]s in place, inserting a
//! default when the field is absent. Every coercion is idempotent, so a map
//! can be formatted twice with the same result.

use chrono::{DateTime, Utc};
use tracing::warn;

use bbb_core::{ResponseMap, Value, from_epoch_millis, parse_timestamp};

use crate::error::FormatError;

/// In-place coercions over one [`ResponseMap`].
pub struct Formatter<'a> {
    map: &'a mut ResponseMap,
}

impl<'a> Formatter<'a> {
    pub fn new(map: &'a mut ResponseMap) -> Self {
        Self { map }
    }

    /// Coerces `field` to a flag: `true` only for the string `"true"`
    /// (any case). Absent fields become `false`.
    pub fn to_boolean(&mut self, field: &str) -> bool {
        let flag = match self.map.get(field) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Str(s)) => s.trim().eq_ignore_ascii_case("true"),
            Some(Value::Symbol(s)) => s == "true",
            Some(Value::Map(map)) => map
                .get_str(crate::xml::CONTENT_KEY)
                .is_some_and(|s| s.trim().eq_ignore_ascii_case("true")),
            _ => false,
        };
        self.map.insert(field, flag);
        flag
    }

    /// Coerces `field` to an integer. Absent or non-numeric values become 0.
    pub fn to_int(&mut self, field: &str) -> i64 {
        let number = match self.map.get(field) {
            Some(Value::Int(n)) => *n,
            Some(Value::Str(s)) => leading_int(s),
            Some(Value::DateTime(dt)) => dt.timestamp_millis(),
            _ => 0,
        };
        self.map.insert(field, number);
        number
    }

    /// Coerces `field` to a string. Absent fields and empty elements become
    /// `""`.
    pub fn to_string(&mut self, field: &str) -> String {
        let text = match self.map.get(field) {
            Some(Value::Str(s)) => s.clone(),
            Some(value) => value.to_string(),
            None => String::new(),
        };
        self.map.insert(field, text.clone());
        text
    }

    /// Coerces `field` to an instant.
    ///
    /// Absent, empty, `null` and epoch-zero values become [`Value::Null`].
    /// Integers and all-digit strings are epoch milliseconds; other strings
    /// are parsed as legacy timestamps.
    pub fn to_datetime(&mut self, field: &str) -> Option<DateTime<Utc>> {
        let instant = match self.map.get(field) {
            Some(Value::DateTime(dt)) => Some(*dt),
            Some(Value::Int(millis)) => from_epoch_millis(*millis),
            Some(Value::Str(raw)) => parse_timestamp(raw),
            Some(Value::Null) | Some(Value::Map(_)) | None => None,
            Some(other) => {
                warn!(field, kind = other.kind(), "cannot read a timestamp from this value");
                None
            }
        };
        self.map
            .insert(field, instant.map_or(Value::Null, Value::DateTime));
        instant
    }

    /// Coerces `field` to a lower-cased symbol. Absent fields become the
    /// empty symbol.
    pub fn to_symbol(&mut self, field: &str) -> String {
        let token = match self.map.get(field) {
            Some(Value::Symbol(s)) => s.clone(),
            Some(Value::Str(s)) => s.to_lowercase(),
            Some(value) => value.to_string().to_lowercase(),
            None => String::new(),
        };
        self.map.insert(field, Value::Symbol(token.clone()));
        token
    }

    /// Replaces `collection` with the list of its `child` elements.
    ///
    /// `<attendees/>` becomes an empty list, a single `<attendee>` a list of
    /// one, repeated ones a list of all of them. Returns the list length.
    pub fn flatten(&mut self, collection: &str, child: &str) -> usize {
        let items = match self.map.remove(collection) {
            Some(Value::List(items)) => items,
            Some(Value::Map(mut inner)) => match inner.remove(child) {
                Some(Value::List(items)) => items,
                Some(Value::Null) | None => Vec::new(),
                Some(single) => vec![single],
            },
            _ => Vec::new(),
        };
        let count = items.len();
        self.map.insert(collection, items);
        count
    }

    /// Replaces blank values inside the `field` map with `""`.
    ///
    /// Empty metadata elements decode to empty maps; callers expect empty
    /// strings instead.
    pub fn clean_metadata(&mut self, field: &str) {
        if let Some(metadata) = self.map.get_map_mut(field) {
            for value in metadata.values_mut() {
                if value.is_blank() {
                    *value = Value::Str(String::new());
                }
            }
        }
    }
}

/// Parses the leading integer of `raw`, ignoring surrounding whitespace and
/// trailing garbage.
fn leading_int(raw: &str) -> i64 {
    let raw = raw.trim();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map_or(0, |n| sign * n)
}

/// Normalizes the fields present in every response: `returncode` becomes a
/// flag, `messageKey` and `message` become strings.
///
/// # Errors
///
/// Returns [`FormatError::MissingReturnCode`] when the response has no
/// `returncode`, and [`FormatError::InvalidReturnCode`] when it is neither
/// a string nor a flag.
pub fn default_formatting(map: &mut ResponseMap) -> Result<(), FormatError> {
    let success = match map.get("returncode") {
        None => return Err(FormatError::MissingReturnCode),
        Some(Value::Bool(b)) => *b,
        Some(Value::Str(s)) => s.trim().eq_ignore_ascii_case("success"),
        Some(Value::Map(m)) if m.is_empty() => false,
        Some(other) => return Err(FormatError::InvalidReturnCode(other.kind())),
    };
    map.insert("returncode", success);

    let mut f = Formatter::new(map);
    f.to_string("messageKey");
    f.to_string("message");
    Ok(())
}

/// Formats one entry of a `getMeetings` response.
///
/// `createTime` is only touched when `with_create_time` is set.
pub fn format_meeting(meeting: &mut ResponseMap, with_create_time: bool) {
    let mut f = Formatter::new(meeting);
    for field in ["meetingID", "meetingName", "moderatorPW", "attendeePW", "dialNumber"] {
        f.to_string(field);
    }
    f.to_boolean("hasBeenForciblyEnded");
    f.to_boolean("running");
    for field in ["voiceBridge", "participantCount", "listenerCount", "videoCount"] {
        f.to_int(field);
    }
    if with_create_time {
        f.to_int("createTime");
    }
}

/// Formats one attendee of a `getMeetingInfo` response.
pub fn format_attendee(attendee: &mut ResponseMap) {
    let mut f = Formatter::new(attendee);
    f.to_string("userID");
    f.to_string("fullName");
    f.to_symbol("role");
}

/// Formats one entry of a `getRecordings` response.
pub fn format_recording(recording: &mut ResponseMap) {
    let mut f = Formatter::new(recording);
    f.to_string("recordID");
    f.to_string("meetingID");
    f.to_string("name");
    f.to_boolean("published");
    f.to_datetime("startTime");
    f.to_datetime("endTime");
    f.clean_metadata("metadata");

    if let Some(playback) = recording.get_map_mut("playback") {
        Formatter::new(playback).flatten("format", "format");
        if let Some(formats) = playback.get_list_mut("format") {
            for format in formats.iter_mut().filter_map(Value::as_map_mut) {
                Formatter::new(format).to_int("length");
            }
        }
    }
}

/// Applies `format` to every map in the list stored under `field`.
pub fn format_each(map: &mut ResponseMap, field: &str, mut format: impl FnMut(&mut ResponseMap)) {
    if let Some(items) = map.get_list_mut(field) {
        for item in items.iter_mut().filter_map(Value::as_map_mut) {
            format(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;
    use chrono::TimeZone;

    fn decode(body: &str) -> ResponseMap {
        xml::decode(body).unwrap().into_map().unwrap()
    }

    #[test]
    fn default_formatting_on_failure() {
        let mut map = decode(
            "<response><returncode>FAILED</returncode><messageKey>notFound</messageKey><message>We could not find a meeting with that meeting ID</message></response>",
        );
        default_formatting(&mut map).unwrap();
        assert_eq!(map.get_bool("returncode"), Some(false));
        assert_eq!(map.get_str("messageKey"), Some("notFound"));
        assert_eq!(
            map.get_str("message"),
            Some("We could not find a meeting with that meeting ID")
        );
    }

    #[test]
    fn default_formatting_fills_message_fields() {
        let mut map = decode("<response><returncode>success</returncode><messageKey/></response>");
        default_formatting(&mut map).unwrap();
        assert_eq!(map.get_bool("returncode"), Some(true));
        assert_eq!(map.get_str("messageKey"), Some(""));
        assert_eq!(map.get_str("message"), Some(""));
    }

    #[test]
    fn default_formatting_requires_returncode() {
        let mut map = decode("<response><version>0.9</version></response>");
        assert_eq!(
            default_formatting(&mut map),
            Err(FormatError::MissingReturnCode)
        );
    }

    #[test]
    fn coercions_are_idempotent() {
        let mut map: ResponseMap = [
            ("running", "TRUE"),
            ("count", "12"),
            ("role", "MODERATOR"),
            ("startTime", "1315254777880"),
        ]
        .into_iter()
        .collect();

        for _ in 0..2 {
            let mut f = Formatter::new(&mut map);
            assert!(f.to_boolean("running"));
            assert_eq!(f.to_int("count"), 12);
            assert_eq!(f.to_symbol("role"), "moderator");
            assert_eq!(f.to_string("count"), "12");
            assert!(f.to_datetime("startTime").is_some());
        }
        assert_eq!(map.get_symbol("role"), Some("moderator"));
    }

    #[test]
    fn absent_fields_get_defaults() {
        let mut map = ResponseMap::new();
        let mut f = Formatter::new(&mut map);
        assert!(!f.to_boolean("running"));
        assert_eq!(f.to_int("voiceBridge"), 0);
        assert_eq!(f.to_string("meetingName"), "");
        assert_eq!(f.to_symbol("role"), "");
        assert_eq!(f.to_datetime("endTime"), None);

        assert_eq!(map.get_bool("running"), Some(false));
        assert_eq!(map.get_int("voiceBridge"), Some(0));
        assert_eq!(map.get_str("meetingName"), Some(""));
        assert_eq!(map.get("endTime"), Some(&Value::Null));
    }

    #[test]
    fn non_numeric_int_is_zero() {
        let mut map: ResponseMap = [("a", "abc"), ("b", " 42 "), ("c", "7 people")]
            .into_iter()
            .collect();
        let mut f = Formatter::new(&mut map);
        assert_eq!(f.to_int("a"), 0);
        assert_eq!(f.to_int("b"), 42);
        assert_eq!(f.to_int("c"), 7);
    }

    #[test]
    fn datetime_variants() {
        let mut map: ResponseMap = [
            ("zero", "0"),
            ("null", "NULL"),
            ("legacy", "Thu Sep 01 17:51:42 UTC 2011"),
            ("garbage", "yesterday"),
        ]
        .into_iter()
        .collect();
        map.insert("millis", 1315254777880_i64);

        let mut f = Formatter::new(&mut map);
        assert_eq!(f.to_datetime("zero"), None);
        assert_eq!(f.to_datetime("null"), None);
        assert_eq!(f.to_datetime("garbage"), None);
        assert_eq!(
            f.to_datetime("legacy"),
            Some(Utc.with_ymd_and_hms(2011, 9, 1, 17, 51, 42).unwrap())
        );
        assert_eq!(
            f.to_datetime("millis").map(|dt| dt.timestamp_millis()),
            Some(1315254777880)
        );
        assert_eq!(map.get("garbage"), Some(&Value::Null));
    }

    #[test]
    fn flatten_shapes() {
        let mut map = decode(
            "<response><empty/><one><attendee><userID>1</userID></attendee></one><many><attendee><userID>1</userID></attendee><attendee><userID>2</userID></attendee></many></response>",
        );
        let mut f = Formatter::new(&mut map);
        assert_eq!(f.flatten("empty", "attendee"), 0);
        assert_eq!(f.flatten("one", "attendee"), 1);
        assert_eq!(f.flatten("many", "attendee"), 2);
        assert_eq!(f.flatten("many", "attendee"), 2);
        assert_eq!(f.flatten("missing", "attendee"), 0);

        let many = map.get_list("many").unwrap();
        assert_eq!(many[1].as_map().unwrap().get_str("userID"), Some("2"));
        assert_eq!(map.get_list("missing"), Some(&[][..]));
    }

    #[test]
    fn metadata_blanks_become_empty_strings() {
        let mut map = decode(
            "<recording><metadata><title>Demo</title><description/><email>  </email></metadata></recording>",
        );
        Formatter::new(&mut map).clean_metadata("metadata");
        let metadata = map.get_map("metadata").unwrap();
        assert_eq!(metadata.get_str("title"), Some("Demo"));
        assert_eq!(metadata.get_str("description"), Some(""));
        assert_eq!(metadata.get_str("email"), Some(""));
    }

    #[test]
    fn recording_playback_formats() {
        let mut map = decode(
            "<recording><recordID>r1</recordID><published>true</published><startTime>1315254777880</startTime><endTime>0</endTime><playback><format><type>slides</type><url>http://x/1</url><length>62</length></format></playback></recording>",
        );
        format_recording(&mut map);
        assert_eq!(map.get_str("recordID"), Some("r1"));
        assert_eq!(map.get_str("name"), Some(""));
        assert_eq!(map.get_bool("published"), Some(true));
        assert!(map.get_datetime("startTime").is_some());
        assert_eq!(map.get("endTime"), Some(&Value::Null));

        let formats = map.get_map("playback").unwrap().get_list("format").unwrap();
        assert_eq!(formats.len(), 1);
        let format = formats[0].as_map().unwrap();
        assert_eq!(format.get_int("length"), Some(62));
        assert_eq!(format.get_str("type"), Some("slides"));
    }

    #[test]
    fn meeting_create_time_is_gated() {
        let mut with = decode("<meeting><meetingID>m</meetingID><createTime>1389464535956</createTime></meeting>");
        let mut without = with.clone();

        format_meeting(&mut with, true);
        format_meeting(&mut without, false);

        assert_eq!(with.get_int("createTime"), Some(1389464535956));
        assert_eq!(without.get_str("createTime"), Some("1389464535956"));
        assert_eq!(with.get_bool("running"), Some(false));
        assert_eq!(with.get_int("listenerCount"), Some(0));
    }

    #[test]
    fn attendee_role_is_symbol() {
        let mut map = decode("<attendee><userID>u1</userID><fullName>Ann</fullName><role>VIEWER</role></attendee>");
        format_attendee(&mut map);
        assert_eq!(map.get_symbol("role"), Some("viewer"));
        assert_eq!(map.get_str("fullName"), Some("Ann"));
    }
}
