//! Maps raw photo export documents onto canonical [`PhotoRecord`]s.
//!
//! Two document shapes are recognized:
//!
//! - a `GeoJSON` feature collection, where each feature carries its fields
//!   in `properties` and its position in `geometry.coordinates` as
//!   `[longitude, latitude, altitude?]`;
//! - a bare array of flat documents with coordinates as plain fields.
//!
//! Field-level problems never fail the batch. A missing or unusable field
//! degrades to its default (empty string, zero coordinate, no priority).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use damage_map_photo_models::time::{format_timestamp, from_epoch};
use damage_map_photo_models::{PhotoRecord, Priority, photo_key};
use serde_json::Value;

use crate::SourceError;
use crate::aliases::FieldAliases;
use crate::parsing::{as_number, as_tags, get_number, get_present, get_text};

/// The result of normalizing one export document.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// One record per input element, in input order.
    pub records: Vec<PhotoRecord>,
    /// Ids that resolved for more than one element, in first-repeat order.
    pub duplicate_ids: Vec<String>,
}

/// Normalizes documents with a configurable alias table.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    aliases: FieldAliases,
}

/// Normalizes `document` with the built-in alias table.
///
/// # Errors
///
/// Returns [`SourceError::Format`] if the document is neither a feature
/// collection nor an array.
pub fn normalize(document: &Value) -> Result<Normalized, SourceError> {
    Normalizer::default().normalize(document)
}

/// Returns the list of elements contained in an export document.
///
/// # Errors
///
/// Returns [`SourceError::Format`] for any shape other than a
/// `FeatureCollection` with a `features` array or a bare array.
pub fn extract_elements(document: &Value) -> Result<&[Value], SourceError> {
    match document {
        Value::Array(items) => Ok(items),
        Value::Object(obj)
            if obj.get("type").and_then(Value::as_str) == Some("FeatureCollection") =>
        {
            obj.get("features")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .ok_or_else(|| SourceError::Format {
                    message: "FeatureCollection without a features array".to_string(),
                })
        }
        Value::Object(obj) => Err(SourceError::Format {
            message: format!(
                "expected a FeatureCollection or an array, got an object with keys [{}]",
                obj.keys().take(8).cloned().collect::<Vec<_>>().join(", ")
            ),
        }),
        other => Err(SourceError::Format {
            message: format!("expected a FeatureCollection or an array, got {}", kind(other)),
        }),
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Normalizer {
    /// Creates a normalizer with a custom alias table.
    #[must_use]
    pub const fn new(aliases: FieldAliases) -> Self {
        Self { aliases }
    }

    /// Returns the alias table in use.
    #[must_use]
    pub const fn aliases(&self) -> &FieldAliases {
        &self.aliases
    }

    /// Normalizes a document, stamping records without a timestamp with
    /// the current time.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Format`] if the document shape is
    /// unrecognized.
    pub fn normalize(&self, document: &Value) -> Result<Normalized, SourceError> {
        self.normalize_at(document, Utc::now())
    }

    /// Normalizes a document using `ingested_at` as the fallback timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Format`] if the document shape is
    /// unrecognized.
    pub fn normalize_at(
        &self,
        document: &Value,
        ingested_at: DateTime<Utc>,
    ) -> Result<Normalized, SourceError> {
        let elements = extract_elements(document)?;
        let fallback_timestamp = format_timestamp(ingested_at);

        let mut records = Vec::with_capacity(elements.len());
        let mut seen = BTreeSet::new();
        let mut duplicate_ids = Vec::new();

        for (index, element) in elements.iter().enumerate() {
            let record = self.normalize_element(element, index, &fallback_timestamp);
            if !seen.insert(record.id.clone()) && !duplicate_ids.contains(&record.id) {
                duplicate_ids.push(record.id.clone());
            }
            records.push(record);
        }

        log::debug!(
            "Normalized {} photo records ({} duplicate ids)",
            records.len(),
            duplicate_ids.len()
        );

        Ok(Normalized {
            records,
            duplicate_ids,
        })
    }

    fn normalize_element(
        &self,
        element: &Value,
        index: usize,
        fallback_timestamp: &str,
    ) -> PhotoRecord {
        let aliases = &self.aliases;
        let properties = element
            .get("properties")
            .filter(|p| p.is_object())
            .unwrap_or(element);

        // ── Position ─────────────────────────────────────────────
        let coordinates = element
            .get("geometry")
            .and_then(|g| g.get("coordinates"))
            .and_then(Value::as_array);

        let (longitude, latitude, altitude) = match coordinates {
            Some(coords) => (
                coords.first().and_then(as_number),
                coords.get(1).and_then(as_number),
                coords.get(2).and_then(as_number),
            ),
            None => (
                first_number(properties, &aliases.longitude),
                first_number(properties, &aliases.latitude),
                first_number(properties, &aliases.altitude),
            ),
        };

        // ── Identity ─────────────────────────────────────────────
        let id = aliases
            .id
            .iter()
            .filter_map(|field| get_present(properties, field))
            .find_map(photo_key)
            .or_else(|| element.get("id").and_then(photo_key))
            .unwrap_or_else(|| format!("photo-{index}"));

        // ── Timestamp ────────────────────────────────────────────
        let timestamp = aliases
            .timestamp
            .iter()
            .filter_map(|field| get_present(properties, field))
            .find_map(|value| match value {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => n.as_f64().and_then(from_epoch).map(format_timestamp),
                _ => None,
            })
            .unwrap_or_else(|| fallback_timestamp.to_string());

        // ── Priority ─────────────────────────────────────────────
        let priority = first_text(properties, &aliases.priority)
            .and_then(|label| Priority::from_upstream(&label));

        // ── Tags ─────────────────────────────────────────────────
        let tags = aliases
            .tags
            .iter()
            .find_map(|field| get_present(properties, field))
            .map(as_tags)
            .unwrap_or_default();

        PhotoRecord {
            id,
            image_url: first_text(properties, &aliases.image_url).unwrap_or_default(),
            latitude: latitude.unwrap_or(0.0),
            longitude: longitude.unwrap_or(0.0),
            altitude,
            direction: first_number(properties, &aliases.direction),
            timestamp,
            description: first_text(properties, &aliases.description).unwrap_or_default(),
            submitter: first_text(properties, &aliases.submitter).unwrap_or_default(),
            priority,
            tags,
        }
    }
}

/// Tries each alias in order and returns the first present text value.
fn first_text(record: &Value, fields: &[String]) -> Option<String> {
    fields.iter().find_map(|field| get_text(record, field))
}

/// Tries each alias in order and returns the first numeric value.
fn first_number(record: &Value, fields: &[String]) -> Option<f64> {
    fields.iter().find_map(|field| get_number(record, field))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn ingested_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap()
    }

    fn normalize_fixed(document: &Value) -> Normalized {
        Normalizer::default()
            .normalize_at(document, ingested_at())
            .unwrap()
    }

    #[test]
    fn geojson_feature_with_critical_priority() {
        let document = serde_json::json!([{
            "id": "a",
            "properties": {"priority": "critical"},
            "geometry": {"coordinates": [-74.0, 40.7]}
        }]);

        let normalized = normalize_fixed(&document);
        assert_eq!(normalized.records.len(), 1);

        let record = &normalized.records[0];
        assert_eq!(record.id, "a");
        assert_eq!(record.priority, Some(Priority::High));
        assert!((record.longitude - -74.0).abs() < f64::EPSILON);
        assert!((record.latitude - 40.7).abs() < f64::EPSILON);
        assert_eq!(record.altitude, None);
    }

    #[test]
    fn feature_collection_unswaps_coordinates() {
        let document = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [-97.74, 30.27, 149.5]},
                    "properties": {"signature": "sig-1", "preview": "https://cdn/1.jpg"}
                },
                {
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": ["-80.19", "25.76"]},
                    "properties": {"uuid": "u-2"}
                }
            ]
        });

        let normalized = normalize_fixed(&document);
        assert_eq!(normalized.records.len(), 2);

        let first = &normalized.records[0];
        assert_eq!(first.id, "sig-1");
        assert_eq!(first.image_url, "https://cdn/1.jpg");
        assert!((first.latitude - 30.27).abs() < f64::EPSILON);
        assert!((first.longitude - -97.74).abs() < f64::EPSILON);
        assert_eq!(first.altitude, Some(149.5));

        let second = &normalized.records[1];
        assert_eq!(second.id, "u-2");
        assert!((second.latitude - 25.76).abs() < f64::EPSILON);
        assert!((second.longitude - -80.19).abs() < f64::EPSILON);
    }

    #[test]
    fn every_feature_yields_one_record_with_unswapped_position() {
        let coords = [
            (-122.4194, 37.7749),
            (0.0, 0.0),
            (151.2093, -33.8688),
            (-179.9, 89.9),
        ];
        let features: Vec<Value> = coords
            .iter()
            .map(|(lng, lat)| {
                serde_json::json!({
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [lng, lat]},
                    "properties": {}
                })
            })
            .collect();
        let document = serde_json::json!({"type": "FeatureCollection", "features": features});

        let normalized = normalize_fixed(&document);
        assert_eq!(normalized.records.len(), coords.len());
        for (record, (lng, lat)) in normalized.records.iter().zip(coords) {
            assert!((record.latitude - lat).abs() < f64::EPSILON);
            assert!((record.longitude - lng).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn flat_documents_use_field_coordinates() {
        let document = serde_json::json!([
            {"ID": 17, "lat": "29.95", "lng": -90.07, "username": "bob", "heading": 275.0},
            {"latitude": 35.0, "longitude": -106.0, "alt": 1600}
        ]);

        let normalized = normalize_fixed(&document);
        let first = &normalized.records[0];
        assert_eq!(first.id, "17");
        assert!((first.latitude - 29.95).abs() < f64::EPSILON);
        assert!((first.longitude - -90.07).abs() < f64::EPSILON);
        assert_eq!(first.submitter, "bob");
        assert_eq!(first.direction, Some(275.0));

        let second = &normalized.records[1];
        assert_eq!(second.id, "photo-1");
        assert_eq!(second.altitude, Some(1600.0));
    }

    #[test]
    fn missing_fields_degrade_to_defaults() {
        let document = serde_json::json!([{}, {"properties": {"priority": "urgent"}}]);

        let normalized = normalize_fixed(&document);
        assert_eq!(normalized.records.len(), 2);

        for (index, record) in normalized.records.iter().enumerate() {
            assert_eq!(record.id, format!("photo-{index}"));
            assert_eq!(record.image_url, "");
            assert_eq!(record.description, "");
            assert_eq!(record.submitter, "");
            assert_eq!(record.priority, None);
            assert!(record.tags.is_empty());
            assert_eq!(record.latitude, 0.0);
            assert_eq!(record.longitude, 0.0);
            assert_eq!(record.altitude, None);
            assert_eq!(record.direction, None);
            assert_eq!(record.timestamp, "2024-10-01T12:00:00.000Z");
        }
    }

    #[test]
    fn alias_order_is_respected() {
        let document = serde_json::json!([{
            "properties": {
                "id": "",
                "uuid": "from-uuid",
                "signature": "from-signature",
                "title": "Collapsed porch",
                "name": "carol",
                "thumbnail": "thumb.jpg",
                "url": "full.jpg",
                "created_at": "2024-09-28T08:00:00Z",
                "date": "2024-01-01"
            }
        }]);

        let record = &normalize_fixed(&document).records[0];
        assert_eq!(record.id, "from-uuid");
        // "title" precedes "name" for description; "name" leads submitter.
        assert_eq!(record.description, "Collapsed porch");
        assert_eq!(record.submitter, "carol");
        assert_eq!(record.image_url, "thumb.jpg");
        assert_eq!(record.timestamp, "2024-09-28T08:00:00Z");
    }

    #[test]
    fn epoch_timestamps_are_rendered() {
        let document = serde_json::json!([{"instant": 1_705_312_200_000_i64}]);
        let record = &normalize_fixed(&document).records[0];
        assert_eq!(record.timestamp, "2024-01-15T09:50:00.000Z");
    }

    #[test]
    fn priority_synonyms_and_tags() {
        let document = serde_json::json!([
            {"id": 1, "priority": "MODERATE", "tags": ["roof", "wind"]},
            {"id": 2, "priority": "Minor", "tags": "flood, basement"}
        ]);

        let normalized = normalize_fixed(&document);
        assert_eq!(normalized.records[0].priority, Some(Priority::Medium));
        assert_eq!(normalized.records[0].tags, vec!["roof", "wind"]);
        assert_eq!(normalized.records[1].priority, Some(Priority::Low));
        assert_eq!(normalized.records[1].tags, vec!["flood", "basement"]);
    }

    #[test]
    fn reports_duplicate_ids() {
        let document = serde_json::json!([
            {"id": "x"}, {"id": "y"}, {"id": "x"}, {"id": 5}, {"id": "5.0"}, {"id": "x"}
        ]);

        let normalized = normalize_fixed(&document);
        assert_eq!(normalized.records.len(), 6);
        assert_eq!(normalized.duplicate_ids, vec!["x", "5"]);
    }

    #[test]
    fn rejects_unrecognized_shapes() {
        for document in [
            serde_json::json!({"type": "Feature", "properties": {}}),
            serde_json::json!({"error": "Failed to fetch data from S3"}),
            serde_json::json!({"type": "FeatureCollection"}),
            serde_json::json!("photos"),
            Value::Null,
        ] {
            let err = normalize(&document).unwrap_err();
            assert!(
                matches!(err, SourceError::Format { .. }),
                "expected format error for {document}, got {err}"
            );
        }
    }

    #[test]
    fn custom_aliases_take_effect() {
        let aliases = crate::parse_alias_toml(r#"submitter = ["inspector"]"#).unwrap();
        let document = serde_json::json!([{"inspector": "dana", "name": "ignored"}]);

        let normalized = Normalizer::new(aliases)
            .normalize_at(&document, ingested_at())
            .unwrap();
        assert_eq!(normalized.records[0].submitter, "dana");
        assert_eq!(normalized.records[0].description, "ignored");
    }
}
