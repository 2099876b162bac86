use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A timestamp handed to clients to echo back. Rendered as RFC 3339 with
/// full sub-second precision so the echoed value compares exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cursor(pub DateTime<Utc>);

impl From<DateTime<Utc>> for Cursor {
    fn from(time: DateTime<Utc>) -> Self {
        Cursor(time)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl FromStr for Cursor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_anchor(s).map(Cursor)
    }
}

impl Serialize for Cursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse an anchor given as epoch seconds or ISO-8601 text. Values without
/// an offset are taken as UTC.
pub fn parse_anchor(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    let invalid = || Error::InvalidAnchor(raw.to_string());

    if let Ok(secs) = raw.parse::<f64>() {
        return epoch_seconds(secs).ok_or_else(invalid);
    }

    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Ok(time.with_timezone(&Utc));
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(invalid)
}

fn epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    let (whole, nanos) = if nanos >= 1_000_000_000 {
        (whole + 1.0, 0)
    } else {
        (whole, nanos)
    };
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp(whole as i64, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_epoch_seconds() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 50, 0).unwrap();
        assert_eq!(parse_anchor("1709290200").unwrap(), expected);
        assert_eq!(parse_anchor("1709290200.0").unwrap(), expected);
        assert_eq!(
            parse_anchor("1709290200.5").unwrap(),
            expected + chrono::Duration::milliseconds(500)
        );
    }

    #[test]
    fn test_parse_iso_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 50, 0).unwrap();
        for raw in [
            "2024-03-01T10:50:00Z",
            "2024-03-01T11:50:00+01:00",
            "2024-03-01T10:50:00",
            "2024-03-01 10:50:00",
            "2024-03-01T10:50",
            " 2024-03-01 10:50 ",
        ] {
            assert_eq!(parse_anchor(raw).unwrap(), expected, "{raw}");
        }
        assert_eq!(
            parse_anchor("2024-03-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_rejects_garbage() {
        for raw in ["", "yesterday", "2024-13-01", "NaN", "inf"] {
            assert!(matches!(parse_anchor(raw), Err(Error::InvalidAnchor(_))), "{raw}");
        }
    }

    #[test]
    fn test_cursor_text_is_exact() {
        let time = Utc.timestamp_opt(1_709_290_200, 123_456_789).unwrap();
        let cursor = Cursor(time);
        let text = cursor.to_string();
        assert_eq!(text, "2024-03-01T10:50:00.123456789Z");
        assert_eq!(text.parse::<Cursor>().unwrap(), cursor);
    }

    #[test]
    fn test_cursor_json() {
        let cursor = Cursor(Utc.with_ymd_and_hms(2024, 3, 1, 10, 50, 0).unwrap());
        let json = serde_json::to_string(&cursor).unwrap();
        assert_eq!(json, "\"2024-03-01T10:50:00Z\"");
        assert_eq!(serde_json::from_str::<Cursor>(&json).unwrap(), cursor);
    }
}
