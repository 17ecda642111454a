//! Ordered upstream field-name aliases per canonical photo field.
//!
//! Each canonical field is resolved by trying its aliases in order; the
//! first present value wins. The built-in table covers the survey exports
//! seen so far. Deployments can override individual lists from TOML:
//!
//! ```toml
//! submitter = ["inspector", "name"]
//! tags = ["tags", "labels"]
//! ```
//!
//! Fields missing from the TOML keep their built-in aliases.

use serde::Deserialize;

use crate::SourceError;

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_string()).collect()
}

fn default_id() -> Vec<String> {
    owned(&["id", "ID", "uuid", "signature"])
}

fn default_image_url() -> Vec<String> {
    owned(&["preview", "thumbnail", "imageUrl", "image_url", "url"])
}

fn default_timestamp() -> Vec<String> {
    owned(&["instant", "timestamp", "created_at", "date", "created"])
}

fn default_description() -> Vec<String> {
    owned(&["caption", "description", "title", "name"])
}

fn default_submitter() -> Vec<String> {
    owned(&["name", "username", "user", "author"])
}

fn default_priority() -> Vec<String> {
    owned(&["priority"])
}

fn default_direction() -> Vec<String> {
    owned(&["direction", "heading"])
}

fn default_tags() -> Vec<String> {
    owned(&["tags"])
}

fn default_latitude() -> Vec<String> {
    owned(&["latitude", "lat"])
}

fn default_longitude() -> Vec<String> {
    owned(&["longitude", "lng", "lon"])
}

fn default_altitude() -> Vec<String> {
    owned(&["altitude", "alt", "elevation"])
}

/// Upstream field names for each canonical [`PhotoRecord`] field, tried in
/// order.
///
/// [`PhotoRecord`]: damage_map_photo_models::PhotoRecord
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldAliases {
    /// Photo id. The feature-level `id` of a `GeoJSON` feature is tried
    /// after these.
    #[serde(default = "default_id")]
    pub id: Vec<String>,
    /// Image URL.
    #[serde(default = "default_image_url")]
    pub image_url: Vec<String>,
    /// Capture timestamp (ISO 8601 string or epoch number).
    #[serde(default = "default_timestamp")]
    pub timestamp: Vec<String>,
    /// Description or caption.
    #[serde(default = "default_description")]
    pub description: Vec<String>,
    /// Submitter name.
    #[serde(default = "default_submitter")]
    pub submitter: Vec<String>,
    /// Priority label.
    #[serde(default = "default_priority")]
    pub priority: Vec<String>,
    /// Camera bearing.
    #[serde(default = "default_direction")]
    pub direction: Vec<String>,
    /// Tag list.
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,
    /// Latitude, for flat documents without a geometry.
    #[serde(default = "default_latitude")]
    pub latitude: Vec<String>,
    /// Longitude, for flat documents without a geometry.
    #[serde(default = "default_longitude")]
    pub longitude: Vec<String>,
    /// Altitude, for flat documents without a geometry.
    #[serde(default = "default_altitude")]
    pub altitude: Vec<String>,
}

impl Default for FieldAliases {
    fn default() -> Self {
        Self {
            id: default_id(),
            image_url: default_image_url(),
            timestamp: default_timestamp(),
            description: default_description(),
            submitter: default_submitter(),
            priority: default_priority(),
            direction: default_direction(),
            tags: default_tags(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            altitude: default_altitude(),
        }
    }
}

/// Parses a [`FieldAliases`] table from a TOML string.
///
/// # Errors
///
/// Returns [`SourceError::Aliases`] if the TOML is malformed or a field is
/// not a list of strings.
pub fn parse_alias_toml(toml_str: &str) -> Result<FieldAliases, SourceError> {
    Ok(toml::de::from_str(toml_str)?)
}
