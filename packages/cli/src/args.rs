//! Value parsers for command-line flags.

use chrono::{DateTime, Duration, Utc};
use damage_map_photo_models::time::parse_timestamp;
use damage_map_photo_models::{BoundingBox, Priority};

/// Parses a priority, accepting upstream synonyms (`critical`, `minor`).
pub fn parse_priority(s: &str) -> Result<Priority, String> {
    Priority::from_upstream(s)
        .ok_or_else(|| format!("unknown priority {s:?} (expected high, medium or low)"))
}

/// Parses a lower date bound. Bare dates mean midnight UTC.
pub fn parse_from(s: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(s).ok_or_else(|| format!("invalid date {s:?}"))
}

/// Parses an upper date bound. Bare dates cover the whole day.
pub fn parse_to(s: &str) -> Result<DateTime<Utc>, String> {
    let dt = parse_timestamp(s).ok_or_else(|| format!("invalid date {s:?}"))?;
    if is_bare_date(s) {
        Ok(dt + Duration::days(1) - Duration::milliseconds(1))
    } else {
        Ok(dt)
    }
}

fn is_bare_date(s: &str) -> bool {
    let s = s.trim();
    s.len() == 10 && !s.contains(['T', ' '])
}

/// Parses `west,south,east,north`.
pub fn parse_bbox(s: &str) -> Result<BoundingBox, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid bounding box {s:?}: {e}"))?;

    let &[west, south, east, north] = parts.as_slice() else {
        return Err(format!(
            "invalid bounding box {s:?}: expected west,south,east,north"
        ));
    };
    if west > east || south > north {
        return Err(format!(
            "invalid bounding box {s:?}: west/south must not exceed east/north"
        ));
    }

    Ok(BoundingBox::new(west, south, east, north))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    #[test]
    fn priority_synonyms() {
        assert_eq!(parse_priority("critical"), Ok(Priority::High));
        assert_eq!(parse_priority("Low"), Ok(Priority::Low));
        assert!(parse_priority("urgent").is_err());
    }

    #[test]
    fn bare_upper_date_covers_day() {
        let to = parse_to("2024-05-01").unwrap();
        assert_eq!(
            to,
            Utc.with_ymd_and_hms(2024, 5, 1, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );
        assert_eq!(
            parse_from("2024-05-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_to("2024-05-01T12:00:00Z").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        );
        assert!(parse_from("yesterday").is_err());
    }

    #[test]
    fn bbox_order() {
        assert_eq!(
            parse_bbox("-106.6, 25.8, -93.5, 36.5"),
            Ok(BoundingBox::new(-106.6, 25.8, -93.5, 36.5))
        );
        assert!(parse_bbox("1,2,3").is_err());
        assert!(parse_bbox("a,b,c,d").is_err());
        assert!(parse_bbox("10,0,5,1").is_err());
    }
}
