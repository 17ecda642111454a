#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical damage photo record, priority, and filter types.
//!
//! Every upstream photo export (`GeoJSON` feature collections, flat JSON
//! arrays) is normalized into [`PhotoRecord`]s. Per-user priority overrides
//! live in a separate side-store and are joined onto records at read time
//! by photo id, so both sides agree on one key representation via
//! [`photo_key`] and [`normalize_key`].

pub mod time;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Triage priority assigned to a damage photo.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Priority {
    /// Needs attention first (upstream synonym: `critical`)
    High,
    /// Upstream synonym: `moderate`
    Medium,
    /// Upstream synonym: `minor`
    Low,
}

impl Priority {
    /// Maps an upstream priority label onto the canonical enum.
    ///
    /// Matching is case-insensitive and accepts the synonyms used by the
    /// field survey exports. Anything unrecognized yields `None` so that a
    /// missing priority stays distinguishable from an invalid one.
    #[must_use]
    pub fn from_upstream(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "high" | "critical" => Some(Self::High),
            "medium" | "moderate" => Some(Self::Medium),
            "low" | "minor" => Some(Self::Low),
            _ => None,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::High, Self::Medium, Self::Low]
    }
}

/// A damage-assessment photo normalized to the canonical schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    /// Stable identity within one loaded snapshot.
    pub id: String,
    /// Preview or full image URL.
    pub image_url: String,
    /// Latitude (WGS84). Zero when the upstream record had none.
    pub latitude: f64,
    /// Longitude (WGS84). Zero when the upstream record had none.
    pub longitude: f64,
    /// Altitude in meters.
    pub altitude: Option<f64>,
    /// Compass bearing of the camera, degrees 0-360.
    pub direction: Option<f64>,
    /// Capture time (ISO 8601). Ingestion time when the upstream record had none.
    pub timestamp: String,
    /// Caption or description text.
    pub description: String,
    /// Who submitted the photo.
    pub submitter: String,
    /// Triage priority, if any.
    pub priority: Option<Priority>,
    /// Free-form tags, in upstream order.
    pub tags: Vec<String>,
}

impl PhotoRecord {
    /// Parses [`Self::timestamp`] into an instant.
    #[must_use]
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        time::parse_timestamp(&self.timestamp)
    }
}

/// A per-user priority override row, unique on `(photo_id, user_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityOverride {
    /// Canonical photo key (see [`normalize_key`]).
    pub photo_id: String,
    /// The user that set the override.
    pub user_id: String,
    /// Overriding priority.
    pub priority: Priority,
}

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Covers every valid coordinate.
    pub const WORLD: Self = Self::new(-180.0, -90.0, 180.0, 90.0);

    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Closed rectangle test: points on an edge are inside.
    #[must_use]
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.south && lat <= self.north && lng >= self.west && lng <= self.east
    }
}

/// The active photo filters. Every field is optional; absent means the
/// corresponding filter stage is inactive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    /// Inclusive lower bound on capture time.
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on capture time.
    pub end_date: Option<DateTime<Utc>>,
    /// Exact submitter match.
    pub submitter: Option<String>,
    /// Exact priority match.
    pub priority: Option<Priority>,
    /// Case-insensitive free-text search.
    pub search_text: Option<String>,
}

impl FilterState {
    /// Returns `true` if no filter is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start_date.is_none()
            && self.end_date.is_none()
            && self.submitter.is_none()
            && self.priority.is_none()
            && self.search_text.is_none()
    }
}

/// A partial update to a [`FilterState`].
///
/// The outer `Option` selects whether a field is touched; the inner one is
/// the new value, so `Some(None)` clears a single filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::option_option)]
pub struct FilterUpdate {
    /// New start date.
    pub start_date: Option<Option<DateTime<Utc>>>,
    /// New end date.
    pub end_date: Option<Option<DateTime<Utc>>>,
    /// New submitter.
    pub submitter: Option<Option<String>>,
    /// New priority.
    pub priority: Option<Option<Priority>>,
    /// New search text.
    pub search_text: Option<Option<String>>,
}

impl FilterUpdate {
    /// Merges this update into `state`, leaving untouched fields as-is.
    pub fn apply_to(self, state: &mut FilterState) {
        if let Some(start_date) = self.start_date {
            state.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            state.end_date = end_date;
        }
        if let Some(submitter) = self.submitter {
            state.submitter = submitter;
        }
        if let Some(priority) = self.priority {
            state.priority = priority;
        }
        if let Some(search_text) = self.search_text {
            state.search_text = search_text;
        }
    }
}

impl From<FilterState> for FilterUpdate {
    fn from(state: FilterState) -> Self {
        Self {
            start_date: Some(state.start_date),
            end_date: Some(state.end_date),
            submitter: Some(state.submitter),
            priority: Some(state.priority),
            search_text: Some(state.search_text),
        }
    }
}

/// Normalizes a textual photo id to its canonical key.
///
/// Ids are sometimes persisted from a numeric JSON value and later read
/// back as text (or vice versa), so `"42"`, `" 42 "` and `"42.0"` must all
/// resolve to the same key. Leading zeros are significant and kept.
#[must_use]
pub fn normalize_key(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Some((int, frac)) = trimmed.split_once('.') {
        let digits = int.strip_prefix('-').unwrap_or(int);
        if !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && !frac.is_empty()
            && frac.bytes().all(|b| b == b'0')
        {
            return int.to_string();
        }
    }

    trimmed.to_string()
}

/// Derives the canonical key from an upstream JSON id value.
///
/// Strings and numbers are accepted; anything else (null, objects, empty
/// strings) yields `None`.
#[must_use]
pub fn photo_key(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => {
            let key = normalize_key(s);
            if key.is_empty() { None } else { Some(key) }
        }
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(i.to_string());
            }
            if let Some(u) = n.as_u64() {
                return Some(u.to_string());
            }
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| normalize_key(&f.to_string()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_synonyms() {
        assert_eq!(Priority::from_upstream("CRITICAL"), Some(Priority::High));
        assert_eq!(Priority::from_upstream("Moderate"), Some(Priority::Medium));
        assert_eq!(Priority::from_upstream(" minor "), Some(Priority::Low));
        assert_eq!(Priority::from_upstream("urgent"), None);
        assert_eq!(Priority::from_upstream(""), None);
    }

    #[test]
    fn priority_string_roundtrip() {
        for p in Priority::all() {
            let parsed: Priority = p.to_string().parse().unwrap();
            assert_eq!(parsed, *p);
        }
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(Priority::Medium.as_ref(), "medium");
    }

    #[test]
    fn priority_serializes_lowercase() {
        let json = serde_json::to_string(&Priority::Low).unwrap();
        assert_eq!(json, "\"low\"");
    }

    #[test]
    fn bbox_is_closed() {
        let bbox = BoundingBox::new(-106.6, 25.8, -93.5, 36.5);
        assert!(bbox.contains(30.0, -97.7));
        assert!(bbox.contains(36.5, -93.5));
        assert!(bbox.contains(25.8, -106.6));
        assert!(!bbox.contains(45.0, -70.0));
        assert!(!bbox.contains(36.500_001, -97.7));
    }

    #[test]
    fn filter_update_merges_partially() {
        let mut state = FilterState {
            submitter: Some("alice".to_string()),
            priority: Some(Priority::High),
            ..FilterState::default()
        };

        FilterUpdate {
            priority: Some(None),
            search_text: Some(Some("roof".to_string())),
            ..FilterUpdate::default()
        }
        .apply_to(&mut state);

        assert_eq!(state.submitter.as_deref(), Some("alice"));
        assert_eq!(state.priority, None);
        assert_eq!(state.search_text.as_deref(), Some("roof"));
    }

    #[test]
    fn normalizes_numeric_text_keys() {
        assert_eq!(normalize_key("42"), "42");
        assert_eq!(normalize_key(" 42 "), "42");
        assert_eq!(normalize_key("42.0"), "42");
        assert_eq!(normalize_key("-7.00"), "-7");
        assert_eq!(normalize_key("007"), "007");
        assert_eq!(normalize_key("4.5"), "4.5");
        assert_eq!(normalize_key("abc.0"), "abc.0");
    }

    #[test]
    fn photo_key_from_json() {
        assert_eq!(photo_key(&serde_json::json!(42)), Some("42".to_string()));
        assert_eq!(photo_key(&serde_json::json!(42.0)), Some("42".to_string()));
        assert_eq!(
            photo_key(&serde_json::json!("abc-1")),
            Some("abc-1".to_string())
        );
        assert_eq!(photo_key(&serde_json::json!("  ")), None);
        assert_eq!(photo_key(&serde_json::Value::Null), None);
        assert_eq!(photo_key(&serde_json::json!({"id": 1})), None);
    }
}
