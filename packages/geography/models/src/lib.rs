#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Static geography tables for jurisdiction masking.
//!
//! Jurisdictions are approximated by axis-aligned bounding boxes, one per
//! US state. These tables are data only; membership decisions live in
//! `damage_map_geography`.

pub mod states;

pub use states::{
    MapCenter, NATIONAL_CENTER, NATIONAL_NAME, STATES, State, map_center, state_by_name,
};
