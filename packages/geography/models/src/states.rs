//! US state bounding boxes and map framing.
//!
//! Boxes are axis-aligned approximations of each state's extent, used to
//! decide whether a photo falls inside a caller's jurisdiction. Centers
//! and zoom levels frame the state on a web map.

use damage_map_photo_models::BoundingBox;
use serde::Serialize;

/// Where and how far to zoom a map to frame a region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapCenter {
    /// Center latitude.
    pub lat: f64,
    /// Center longitude.
    pub lng: f64,
    /// Web map zoom level.
    pub zoom: u8,
}

impl MapCenter {
    const fn new(lat: f64, lng: f64, zoom: u8) -> Self {
        Self { lat, lng, zoom }
    }
}

/// Framing for the whole contiguous United States.
#[allow(clippy::unreadable_literal)]
pub const NATIONAL_CENTER: MapCenter = MapCenter::new(39.8283, -98.5795, 4);

/// Name used by profiles with nationwide visibility.
pub const NATIONAL_NAME: &str = "United States";

/// A US state with its extent and map framing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct State {
    /// Full state name (e.g. `"Texas"`).
    pub name: &'static str,
    /// Two-letter postal abbreviation.
    pub abbr: &'static str,
    /// Approximate extent.
    pub bounds: BoundingBox,
    /// Map framing.
    pub center: MapCenter,
}

const fn state(
    name: &'static str,
    abbr: &'static str,
    bounds: BoundingBox,
    center: MapCenter,
) -> State {
    State {
        name,
        abbr,
        bounds,
        center,
    }
}

/// The 50 US states, alphabetical by name.
#[allow(clippy::unreadable_literal)]
#[rustfmt::skip]
pub const STATES: &[State] = &[
    state("Alabama", "AL", BoundingBox::new(-88.4731, 30.1955, -84.8880, 35.0080), MapCenter::new(32.806671, -86.79113, 7)),
    state("Alaska", "AK", BoundingBox::new(-179.1506, 51.2097, -129.9929, 71.5388), MapCenter::new(61.570716, -152.404419, 5)),
    state("Arizona", "AZ", BoundingBox::new(-114.8165, 31.3322, -109.0452, 37.0042), MapCenter::new(33.729759, -111.431221, 7)),
    state("Arkansas", "AR", BoundingBox::new(-94.6178, 33.0041, -89.6444, 36.4996), MapCenter::new(34.969704, -92.373123, 7)),
    state("California", "CA", BoundingBox::new(-124.4096, 32.5343, -114.1312, 42.0095), MapCenter::new(36.116203, -119.681564, 6)),
    state("Colorado", "CO", BoundingBox::new(-109.0489, 36.9949, -102.0424, 41.0034), MapCenter::new(39.059811, -105.311104, 7)),
    state("Connecticut", "CT", BoundingBox::new(-73.7277, 40.9509, -71.7870, 42.0508), MapCenter::new(41.597782, -72.755371, 8)),
    state("Delaware", "DE", BoundingBox::new(-75.7888, 38.4510, -75.0489, 39.8394), MapCenter::new(39.318523, -75.507141, 9)),
    state("Florida", "FL", BoundingBox::new(-87.6349, 24.5446, -80.0314, 31.0009), MapCenter::new(27.766279, -81.686783, 7)),
    state("Georgia", "GA", BoundingBox::new(-85.6051, 30.3176, -80.7014, 35.0008), MapCenter::new(33.040619, -83.643074, 7)),
    state("Hawaii", "HI", BoundingBox::new(-178.4438, 18.9117, -154.8066, 28.4318), MapCenter::new(21.094318, -157.498337, 7)),
    state("Idaho", "ID", BoundingBox::new(-117.2431, 41.9880, -111.0435, 49.0011), MapCenter::new(44.240459, -114.478828, 6)),
    state("Illinois", "IL", BoundingBox::new(-91.5130, 36.9540, -87.0199, 42.5083), MapCenter::new(40.349457, -88.986137, 7)),
    state("Indiana", "IN", BoundingBox::new(-88.0978, 37.7717, -84.7844, 41.7606), MapCenter::new(39.849426, -86.258278, 7)),
    state("Iowa", "IA", BoundingBox::new(-96.6397, 40.3754, -90.1401, 43.5012), MapCenter::new(42.011539, -93.210526, 7)),
    state("Kansas", "KS", BoundingBox::new(-102.0517, 36.9932, -94.5888, 40.0031), MapCenter::new(38.5266, -96.726486, 7)),
    state("Kentucky", "KY", BoundingBox::new(-89.5715, 36.4970, -81.9648, 39.1472), MapCenter::new(37.668140, -84.670067, 7)),
    state("Louisiana", "LA", BoundingBox::new(-94.0431, 28.9210, -88.8172, 33.0197), MapCenter::new(31.169546, -91.867805, 7)),
    state("Maine", "ME", BoundingBox::new(-71.0844, 43.0642, -66.9854, 47.4598), MapCenter::new(44.693947, -69.381927, 7)),
    state("Maryland", "MD", BoundingBox::new(-79.4877, 37.9113, -75.0487, 39.7237), MapCenter::new(39.063946, -76.802101, 8)),
    state("Massachusetts", "MA", BoundingBox::new(-73.5081, 41.2376, -69.8589, 42.8867), MapCenter::new(42.230171, -71.530106, 8)),
    state("Michigan", "MI", BoundingBox::new(-90.4180, 41.6960, -82.1430, 48.2388), MapCenter::new(43.326618, -84.536095, 7)),
    state("Minnesota", "MN", BoundingBox::new(-97.2390, 43.4994, -89.4836, 49.3844), MapCenter::new(45.694454, -93.900192, 7)),
    state("Mississippi", "MS", BoundingBox::new(-91.6540, 30.1390, -88.0972, 35.0041), MapCenter::new(32.741646, -89.678696, 7)),
    state("Missouri", "MO", BoundingBox::new(-95.7742, 35.9957, -89.0988, 40.6136), MapCenter::new(38.456085, -92.288368, 7)),
    state("Montana", "MT", BoundingBox::new(-116.0636, 44.3583, -104.0573, 49.0011), MapCenter::new(47.052952, -110.454353, 6)),
    state("Nebraska", "NE", BoundingBox::new(-104.0573, 39.9999, -95.3080, 43.0017), MapCenter::new(41.12537, -98.268082, 7)),
    state("Nevada", "NV", BoundingBox::new(-120.0057, 35.0018, -114.0396, 42.0022), MapCenter::new(37.881212, -117.220068, 6)),
    state("New Hampshire", "NH", BoundingBox::new(-72.5570, 42.6970, -70.6103, 45.3058), MapCenter::new(43.452492, -71.563896, 8)),
    state("New Jersey", "NJ", BoundingBox::new(-75.5594, 38.9284, -73.8935, 41.3574), MapCenter::new(40.298904, -74.756138, 8)),
    state("New Mexico", "NM", BoundingBox::new(-109.0501, 31.3328, -103.0418, 37.0002), MapCenter::new(34.307144, -106.018066, 7)),
    state("New York", "NY", BoundingBox::new(-79.7624, 40.4774, -71.7776, 45.0158), MapCenter::new(42.165726, -74.948051, 7)),
    state("North Carolina", "NC", BoundingBox::new(-84.3218, 33.7514, -75.3274, 36.5881), MapCenter::new(35.630066, -79.806419, 7)),
    state("North Dakota", "ND", BoundingBox::new(-104.0489, 45.9354, -96.5543, 49.0011), MapCenter::new(47.528912, -99.784012, 7)),
    state("Ohio", "OH", BoundingBox::new(-84.8203, 38.4031, -80.5190, 41.9773), MapCenter::new(40.388783, -82.764915, 7)),
    state("Oklahoma", "OK", BoundingBox::new(-103.0025, 33.6323, -94.4312, 37.0020), MapCenter::new(35.565342, -96.928917, 7)),
    state("Oregon", "OR", BoundingBox::new(-124.7034, 41.9918, -116.4635, 46.2991), MapCenter::new(44.931109, -123.029159, 7)),
    state("Pennsylvania", "PA", BoundingBox::new(-80.5190, 39.7198, -74.6895, 42.5147), MapCenter::new(40.590752, -77.209755, 7)),
    state("Rhode Island", "RI", BoundingBox::new(-71.8965, 41.1460, -71.1205, 42.0188), MapCenter::new(41.680893, -71.51178, 9)),
    state("South Carolina", "SC", BoundingBox::new(-83.3532, 32.0346, -78.4850, 35.2155), MapCenter::new(33.856892, -80.945007, 7)),
    state("South Dakota", "SD", BoundingBox::new(-104.0573, 42.4790, -96.4364, 45.9454), MapCenter::new(44.299782, -99.438828, 7)),
    state("Tennessee", "TN", BoundingBox::new(-90.3103, 34.9829, -81.6469, 36.6781), MapCenter::new(35.747845, -86.692345, 7)),
    state("Texas", "TX", BoundingBox::new(-106.6456, 25.8371, -93.5080, 36.5007), MapCenter::new(31.054487, -97.563461, 6)),
    state("Utah", "UT", BoundingBox::new(-114.0524, 36.9979, -109.0452, 42.0013), MapCenter::new(40.150032, -111.862434, 7)),
    state("Vermont", "VT", BoundingBox::new(-73.4379, 42.7269, -71.4653, 45.0155), MapCenter::new(44.045876, -72.710686, 8)),
    state("Virginia", "VA", BoundingBox::new(-83.6753, 36.5407, -75.1652, 39.4660), MapCenter::new(37.769337, -78.169968, 7)),
    state("Washington", "WA", BoundingBox::new(-124.8489, 45.5437, -116.9177, 49.0024), MapCenter::new(47.400902, -121.490494, 7)),
    state("West Virginia", "WV", BoundingBox::new(-82.6447, 37.2015, -77.7190, 40.6381), MapCenter::new(38.491226, -80.954453, 8)),
    state("Wisconsin", "WI", BoundingBox::new(-92.8891, 42.4919, -86.2494, 47.0774), MapCenter::new(44.268543, -89.616508, 7)),
    state("Wyoming", "WY", BoundingBox::new(-111.0567, 40.9979, -104.0573, 45.0058), MapCenter::new(42.755966, -107.302490, 7)),
];

/// Looks up a state by full name or postal abbreviation,
/// case-insensitively.
#[must_use]
pub fn state_by_name(name: &str) -> Option<&'static State> {
    let name = name.trim();
    STATES
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name) || s.abbr.eq_ignore_ascii_case(name))
}

/// Returns the map framing for a region name, falling back to the
/// national view for unknown names.
#[must_use]
pub fn map_center(name: &str) -> MapCenter {
    state_by_name(name).map_or(NATIONAL_CENTER, |s| s.center)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifty_states() {
        assert_eq!(STATES.len(), 50);
    }

    #[test]
    fn abbreviations_are_unique() {
        let mut abbrs: Vec<_> = STATES.iter().map(|s| s.abbr).collect();
        abbrs.sort_unstable();
        abbrs.dedup();
        assert_eq!(abbrs.len(), STATES.len());
    }

    #[test]
    fn boxes_are_well_formed() {
        for s in STATES {
            assert!(s.bounds.south < s.bounds.north, "inverted lat: {}", s.name);
            assert!(s.bounds.west < s.bounds.east, "inverted lng: {}", s.name);
        }
    }

    #[test]
    fn centers_fall_inside_their_state() {
        for s in STATES {
            assert!(
                s.bounds.contains(s.center.lat, s.center.lng),
                "center outside bounds: {}",
                s.name
            );
        }
    }

    #[test]
    fn lookup_by_name_or_abbr() {
        assert_eq!(state_by_name("texas").map(|s| s.abbr), Some("TX"));
        assert_eq!(state_by_name(" New York ").map(|s| s.abbr), Some("NY"));
        assert_eq!(state_by_name("wa").map(|s| s.name), Some("Washington"));
        assert!(state_by_name("Puerto Rico").is_none());
    }

    #[test]
    fn map_center_falls_back_to_national() {
        assert_eq!(map_center("Texas").zoom, 6);
        assert_eq!(map_center("Atlantis"), NATIONAL_CENTER);
        assert_eq!(map_center(NATIONAL_NAME), NATIONAL_CENTER);
    }
}
