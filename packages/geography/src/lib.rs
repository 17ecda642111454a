#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Caller jurisdiction resolution and membership tests.
//!
//! A caller either sees every photo ([`Jurisdiction::Unrestricted`], the
//! national view) or only photos inside one region's bounding box. The
//! region comes from the caller's profile via a [`ProfileResolver`] and is
//! resolved against the static state table in
//! [`damage_map_geography_models`].

use async_trait::async_trait;
use damage_map_geography_models::{NATIONAL_NAME, state_by_name};
use damage_map_photo_models::BoundingBox;
use serde::Serialize;

pub use damage_map_geography_models::{MapCenter, NATIONAL_CENTER, STATES, State, map_center};

/// Errors that can occur while resolving a caller's jurisdiction.
#[derive(Debug, thiserror::Error)]
pub enum GeographyError {
    /// The profile lookup failed.
    #[error("Profile lookup failed: {0}")]
    Profile(String),
}

/// The geographic scope a caller may see.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Jurisdiction {
    /// Nationwide visibility.
    Unrestricted,
    /// Visibility limited to one region's bounding box.
    Region {
        /// Region name as it was resolved.
        name: String,
        /// Region extent.
        bounds: BoundingBox,
    },
}

impl Jurisdiction {
    /// Resolves a region name from a caller profile.
    ///
    /// `"United States"` and `"national"` (any case) are unrestricted.
    /// State names and postal abbreviations resolve to the state's box.
    /// Unknown names resolve to a world-sized region so that a bad profile
    /// value never hides photos; check [`Self::is_fallback`] to detect it.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let trimmed = name.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case(NATIONAL_NAME)
            || trimmed.eq_ignore_ascii_case("national")
        {
            return Self::Unrestricted;
        }

        if let Some(state) = state_by_name(trimmed) {
            return Self::Region {
                name: state.name.to_string(),
                bounds: state.bounds,
            };
        }

        log::warn!("Unknown jurisdiction {trimmed:?}; falling back to unrestricted bounds");
        Self::Region {
            name: trimmed.to_string(),
            bounds: BoundingBox::WORLD,
        }
    }

    /// Returns `true` if no geographic restriction applies.
    #[must_use]
    pub const fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }

    /// Returns `true` for a named region that did not match any known
    /// state and was widened to the whole world.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        match self {
            Self::Unrestricted => false,
            Self::Region { bounds, .. } => *bounds == BoundingBox::WORLD,
        }
    }

    /// The region's bounds, or `None` when unrestricted.
    #[must_use]
    pub const fn bounds(&self) -> Option<&BoundingBox> {
        match self {
            Self::Unrestricted => None,
            Self::Region { bounds, .. } => Some(bounds),
        }
    }

    /// Display name: the region name, or `"United States"`.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Unrestricted => NATIONAL_NAME,
            Self::Region { name, .. } => name,
        }
    }

    /// Map framing for this jurisdiction.
    #[must_use]
    pub fn map_center(&self) -> MapCenter {
        map_center(self.name())
    }
}

/// Returns `true` if the point lies inside the caller's jurisdiction.
///
/// Edges are inclusive.
#[must_use]
pub fn is_within_jurisdiction(lat: f64, lng: f64, jurisdiction: &Jurisdiction) -> bool {
    match jurisdiction {
        Jurisdiction::Unrestricted => true,
        Jurisdiction::Region { bounds, .. } => bounds.contains(lat, lng),
    }
}

/// Looks up the current caller's jurisdiction name.
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    /// Returns the caller's region name, or `None` if the caller has no
    /// profile.
    ///
    /// # Errors
    ///
    /// Returns [`GeographyError::Profile`] if the lookup fails.
    async fn jurisdiction_name(&self) -> Result<Option<String>, GeographyError>;
}

/// Resolves the caller's jurisdiction, treating a missing profile or a
/// failed lookup as unrestricted.
pub async fn resolve_jurisdiction(resolver: &dyn ProfileResolver) -> Jurisdiction {
    match resolver.jurisdiction_name().await {
        Ok(Some(name)) => Jurisdiction::from_name(&name),
        Ok(None) => {
            log::info!("No caller profile; using unrestricted jurisdiction");
            Jurisdiction::Unrestricted
        }
        Err(e) => {
            log::warn!("{e}; using unrestricted jurisdiction");
            Jurisdiction::Unrestricted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProfile(Result<Option<String>, String>);

    #[async_trait]
    impl ProfileResolver for FixedProfile {
        async fn jurisdiction_name(&self) -> Result<Option<String>, GeographyError> {
            self.0.clone().map_err(GeographyError::Profile)
        }
    }

    #[test]
    fn texas_membership() {
        let texas = Jurisdiction::Region {
            name: "Texas".to_string(),
            bounds: BoundingBox::new(-106.6, 25.8, -93.5, 36.5),
        };
        assert!(is_within_jurisdiction(30.0, -97.7, &texas));
        assert!(!is_within_jurisdiction(45.0, -70.0, &texas));
    }

    #[test]
    fn edges_are_inside() {
        let texas = Jurisdiction::from_name("Texas");
        let bounds = *texas.bounds().unwrap();
        assert!(is_within_jurisdiction(bounds.north, bounds.west, &texas));
        assert!(is_within_jurisdiction(bounds.south, bounds.east, &texas));
    }

    #[test]
    fn unrestricted_sees_everything() {
        for name in ["United States", "united states", "National", "  "] {
            let j = Jurisdiction::from_name(name);
            assert!(j.is_unrestricted(), "{name:?} should be unrestricted");
            assert!(is_within_jurisdiction(-89.0, 179.0, &j));
        }
    }

    #[test]
    fn state_names_resolve_to_table_bounds() {
        let j = Jurisdiction::from_name("florida");
        assert_eq!(j.name(), "Florida");
        assert!(!j.is_fallback());
        assert!(is_within_jurisdiction(25.76, -80.19, &j));
        assert!(!is_within_jurisdiction(40.7, -74.0, &j));

        let j = Jurisdiction::from_name("NY");
        assert_eq!(j.name(), "New York");
    }

    #[test]
    fn unknown_name_fails_open() {
        let j = Jurisdiction::from_name("Atlantis");
        assert!(j.is_fallback());
        assert!(!j.is_unrestricted());
        assert_eq!(j.name(), "Atlantis");
        assert!(is_within_jurisdiction(-45.0, 170.0, &j));
        assert_eq!(j.map_center(), NATIONAL_CENTER);
    }

    #[tokio::test]
    async fn resolve_from_profile() {
        let j = resolve_jurisdiction(&FixedProfile(Ok(Some("Texas".to_string())))).await;
        assert_eq!(j.name(), "Texas");

        let j = resolve_jurisdiction(&FixedProfile(Ok(None))).await;
        assert!(j.is_unrestricted());

        let j = resolve_jurisdiction(&FixedProfile(Err("connection refused".to_string()))).await;
        assert!(j.is_unrestricted());
    }
}
