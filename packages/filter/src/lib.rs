#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Derives the visible photo set from the loaded records.
//!
//! The visible set is the AND of independent predicate [`Stage`]s built
//! from five inputs: the caller's jurisdiction, the viewport, the drawn
//! selection, the date/submitter/priority/text filters, and the records
//! themselves. A stage is only built when its input is set, so an empty
//! [`FilterState`] with no viewport, no selection and an unrestricted
//! caller yields every record.
//!
//! Stages do not depend on one another, so evaluation order never changes
//! the result, and records keep their input order.

use chrono::{DateTime, Utc};
use damage_map_geography::{Jurisdiction, is_within_jurisdiction};
use damage_map_photo_models::{BoundingBox, FilterState, PhotoRecord, Priority};
use strum_macros::{AsRefStr, EnumDiscriminants};

/// One predicate over a photo record.
#[derive(Debug, Clone, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(StageKind), derive(AsRefStr))]
pub enum Stage {
    /// Inside the caller's jurisdiction.
    Jurisdiction(Jurisdiction),
    /// Inside the viewport, or the drawn selection when there is no
    /// viewport.
    Spatial(BoundingBox),
    /// Captured within `[start, end]`; either bound may be open. A record
    /// whose timestamp cannot be parsed is never outside the range.
    Date {
        /// Inclusive lower bound.
        start: Option<DateTime<Utc>>,
        /// Inclusive upper bound.
        end: Option<DateTime<Utc>>,
    },
    /// Submitted by exactly this name.
    Submitter(String),
    /// Has exactly this priority.
    Priority(Priority),
    /// Description, submitter or any single tag contains this lowercase
    /// needle.
    Text(String),
}

impl Stage {
    /// Returns `true` if `record` passes this stage.
    #[must_use]
    pub fn matches(&self, record: &PhotoRecord) -> bool {
        match self {
            Self::Jurisdiction(jurisdiction) => {
                is_within_jurisdiction(record.latitude, record.longitude, jurisdiction)
            }
            Self::Spatial(bounds) => bounds.contains(record.latitude, record.longitude),
            Self::Date { start, end } => record.captured_at().is_none_or(|captured| {
                start.is_none_or(|start| captured >= start)
                    && end.is_none_or(|end| captured <= end)
            }),
            Self::Submitter(submitter) => record.submitter == *submitter,
            Self::Priority(priority) => record.priority == Some(*priority),
            Self::Text(needle) => {
                contains_folded(&record.description, needle)
                    || contains_folded(&record.submitter, needle)
                    || record.tags.iter().any(|tag| contains_folded(tag, needle))
            }
        }
    }

    /// Which kind of stage this is.
    #[must_use]
    pub fn kind(&self) -> StageKind {
        StageKind::from(self)
    }
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// The active stages for one set of inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Builds the active stages, in canonical order.
    ///
    /// The viewport takes precedence over the drawn selection. Empty
    /// submitter and search strings are treated as unset; a non-empty
    /// search is matched as given, surrounding whitespace included.
    #[must_use]
    pub fn new(
        filter: &FilterState,
        selected_region: Option<&BoundingBox>,
        viewport: Option<&BoundingBox>,
        jurisdiction: &Jurisdiction,
    ) -> Self {
        let mut stages = Vec::new();

        if !jurisdiction.is_unrestricted() {
            stages.push(Stage::Jurisdiction(jurisdiction.clone()));
        }
        if let Some(bounds) = viewport.or(selected_region) {
            stages.push(Stage::Spatial(*bounds));
        }
        if filter.start_date.is_some() || filter.end_date.is_some() {
            stages.push(Stage::Date {
                start: filter.start_date,
                end: filter.end_date,
            });
        }
        if let Some(submitter) = filter.submitter.as_deref().filter(|s| !s.is_empty()) {
            stages.push(Stage::Submitter(submitter.to_string()));
        }
        if let Some(priority) = filter.priority {
            stages.push(Stage::Priority(priority));
        }
        if let Some(text) = filter.search_text.as_deref().filter(|s| !s.is_empty()) {
            stages.push(Stage::Text(text.to_lowercase()));
        }

        Self { stages }
    }

    /// Builds a pipeline from explicit stages.
    #[must_use]
    pub const fn from_stages(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// The active stages.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns `true` if `record` passes every stage.
    #[must_use]
    pub fn matches(&self, record: &PhotoRecord) -> bool {
        self.stages.iter().all(|stage| stage.matches(record))
    }

    /// Returns the records passing every stage, in input order.
    #[must_use]
    pub fn apply(&self, records: &[PhotoRecord]) -> Vec<PhotoRecord> {
        let visible: Vec<PhotoRecord> = records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect();

        if !self.stages.is_empty() {
            log::debug!(
                "Filtered {} -> {} photos via [{}]",
                records.len(),
                visible.len(),
                self.stages
                    .iter()
                    .map(|s| s.kind().as_ref().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        visible
    }
}

/// Derives the visible set: every record that passes all active stages,
/// in input order.
#[must_use]
pub fn derive_visible_set(
    all: &[PhotoRecord],
    filter: &FilterState,
    selected_region: Option<&BoundingBox>,
    viewport: Option<&BoundingBox>,
    jurisdiction: &Jurisdiction,
) -> Vec<PhotoRecord> {
    Pipeline::new(filter, selected_region, viewport, jurisdiction).apply(all)
}
