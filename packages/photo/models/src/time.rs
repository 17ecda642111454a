//! Timestamp parsing shared by normalization and date filtering.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Epoch values above this are treated as milliseconds rather than seconds
/// (1e11 seconds is roughly the year 5138).
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

/// Date-times with an explicit offset that RFC 3339 rejects (`+0000`).
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Date-times without an offset, assumed UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Bare dates, midnight UTC.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parses an upstream timestamp string.
///
/// Accepts RFC 3339 and RFC 2822 (with any offset), ISO 8601 date-times
/// with compact `+hhmm` offsets, naive date-times with `-` or `/`
/// separators (assumed UTC), and bare dates (midnight UTC).
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }
    None
}

/// Converts an epoch value (seconds or milliseconds) to an instant.
#[must_use]
pub fn from_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    let ms = if value.abs() > EPOCH_MILLIS_THRESHOLD {
        value
    } else {
        value * 1000.0
    };
    #[allow(clippy::cast_possible_truncation)]
    DateTime::from_timestamp_millis(ms as i64)
}

/// Formats an instant the way normalized records store timestamps.
#[must_use]
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_with_offset() {
        let dt = parse_timestamp("2024-09-27T10:15:00-04:00").unwrap();
        assert_eq!(dt.to_string(), "2024-09-27 14:15:00 UTC");
    }

    #[test]
    fn parses_naive_variants() {
        assert_eq!(
            parse_timestamp("2024-01-15T14:30:00.000").unwrap().to_string(),
            "2024-01-15 14:30:00 UTC"
        );
        assert_eq!(
            parse_timestamp("2024-01-15 14:30:00").unwrap().to_string(),
            "2024-01-15 14:30:00 UTC"
        );
        assert_eq!(
            parse_timestamp("2024-01-15").unwrap().to_string(),
            "2024-01-15 00:00:00 UTC"
        );
    }

    #[test]
    fn parses_loose_formats() {
        for s in [
            "Wed, 01 May 2024 10:00:00 GMT",
            "Wed, 01 May 2024 06:00:00 -0400",
            "2024-05-01T10:00:00+0000",
            "2024-05-01T12:00:00.250+0200",
            "2024/05/01 10:00",
            "2024/05/01 10:00:00",
            "05/01/2024 10:00",
            "2024-05-01T10:00",
        ] {
            let dt = parse_timestamp(s).unwrap_or_else(|| panic!("failed to parse {s:?}"));
            assert_eq!(
                dt.format("%Y-%m-%d %H:%M").to_string(),
                "2024-05-01 10:00",
                "{s}"
            );
        }
        assert_eq!(
            parse_timestamp("2024/05/01").unwrap().to_string(),
            "2024-05-01 00:00:00 UTC"
        );
        assert_eq!(
            parse_timestamp("05/01/2024").unwrap().to_string(),
            "2024-05-01 00:00:00 UTC"
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("2024/13/45").is_none());
    }

    #[test]
    fn epoch_seconds_and_millis_agree() {
        let secs = from_epoch(1_705_312_200.0).unwrap();
        let millis = from_epoch(1_705_312_200_000.0).unwrap();
        assert_eq!(secs, millis);
        assert_eq!(format_timestamp(secs), "2024-01-15T09:50:00.000Z");
        assert!(from_epoch(f64::NAN).is_none());
    }
}
