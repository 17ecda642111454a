//! Lenient JSON field accessors shared by the normalizer.
//!
//! Upstream exports disagree on types as much as on names: coordinates
//! arrive as numbers or numeric strings, ids as strings or integers. These
//! helpers accept both and treat `null` and empty strings as missing.

use serde_json::Value;

/// Returns the field's value if it is present and meaningful (not `null`,
/// not an empty or whitespace-only string).
#[must_use]
pub fn get_present<'a>(record: &'a Value, field: &str) -> Option<&'a Value> {
    record.get(field).filter(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    })
}

/// Reads a field as text. Numbers are rendered with their JSON
/// representation; booleans, arrays, and objects are rejected.
#[must_use]
pub fn get_text(record: &Value, field: &str) -> Option<String> {
    match get_present(record, field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Interprets a JSON value as a finite `f64`, accepting numeric strings.
#[must_use]
pub fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Reads a field as a finite `f64`, accepting numeric strings.
#[must_use]
pub fn get_number(record: &Value, field: &str) -> Option<f64> {
    get_present(record, field).and_then(as_number)
}

/// Reads a tag list. Arrays keep their string and numeric elements;
/// a plain string is split on commas.
#[must_use]
pub fn as_tags(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_strings_are_missing() {
        let record = serde_json::json!({"a": "", "b": "  ", "c": null, "d": "x"});
        assert!(get_present(&record, "a").is_none());
        assert!(get_present(&record, "b").is_none());
        assert!(get_present(&record, "c").is_none());
        assert!(get_present(&record, "missing").is_none());
        assert_eq!(get_text(&record, "d").as_deref(), Some("x"));
    }

    #[test]
    fn numbers_render_as_text() {
        let record = serde_json::json!({"id": 1234, "flag": true});
        assert_eq!(get_text(&record, "id").as_deref(), Some("1234"));
        assert!(get_text(&record, "flag").is_none());
    }

    #[test]
    fn numeric_strings_parse() {
        let record = serde_json::json!({"lat": "40.7128", "lng": -74.006, "bad": "north"});
        assert!((get_number(&record, "lat").unwrap() - 40.7128).abs() < f64::EPSILON);
        assert!((get_number(&record, "lng").unwrap() - -74.006).abs() < f64::EPSILON);
        assert!(get_number(&record, "bad").is_none());
    }

    #[test]
    fn tags_from_array_or_csv() {
        assert_eq!(
            as_tags(&serde_json::json!(["roof", 3, null, "", "flood"])),
            vec!["roof", "3", "flood"]
        );
        assert_eq!(
            as_tags(&serde_json::json!("roof, flood ,,debris")),
            vec!["roof", "flood", "debris"]
        );
        assert!(as_tags(&serde_json::json!({"tag": "x"})).is_empty());
    }
}
