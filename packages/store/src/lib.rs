#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The loaded photo snapshot and everything derived from it.
//!
//! A [`PhotoStore`] fetches the photo export, normalizes it, merges the
//! acting user's priority overrides and keeps the visible set in sync with
//! the filter state, the drawn selection, the map viewport and the
//! caller's jurisdiction.
//!
//! ## Lifecycle
//!
//! The store starts in [`LoadState::Loading`] and moves to
//! [`LoadState::Ready`] once a load finishes, successfully or not. A failed
//! load keeps the previous snapshot (or an empty one), and so does a load
//! whose future is dropped before it finishes. When loads overlap, only the
//! most recently started one that runs to completion commits.
//!
//! ## Concurrency
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! `.await`. Priority edits are applied optimistically and reverted if the
//! side-store write fails. Viewport changes are debounced: each change
//! cancels the pending re-derivation and schedules a new one.

pub mod config;

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use damage_map_filter::derive_visible_set;
use damage_map_geography::{Jurisdiction, ProfileResolver, resolve_jurisdiction};
use damage_map_overrides::{OverrideError, PriorityMutation, Reconciler, apply_overrides};
use damage_map_photo_models::{BoundingBox, FilterState, FilterUpdate, PhotoRecord, Priority};
use damage_map_source::{DocumentSource, Normalizer, SourceError};
use tokio::task::JoinHandle;

pub use config::StoreConfig;

/// Errors returned by store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Fetching or normalizing the photo export failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Reading or writing an override failed.
    #[error(transparent)]
    Override(#[from] OverrideError),
}

/// Whether a load is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// A load has started and not yet committed.
    Loading,
    /// The current snapshot is settled.
    Ready,
}

/// Counts from the most recent successful load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Records kept in the snapshot.
    pub records: usize,
    /// Later records dropped because their id was already taken.
    pub duplicates_dropped: usize,
    /// Records whose priority came from an override.
    pub overrides_applied: usize,
}

struct StoreState {
    load_state: LoadState,
    records: Vec<PhotoRecord>,
    visible: Vec<PhotoRecord>,
    filter: FilterState,
    selected_region: Option<BoundingBox>,
    viewport: Option<BoundingBox>,
    jurisdiction: Jurisdiction,
    /// Bumped on every committed load.
    generation: u64,
    /// Bumped on every started load.
    load_seq: u64,
    /// Loads started and neither finished nor dropped.
    in_flight: BTreeSet<u64>,
    /// Newest load that ran to completion, committed or failed.
    settled_seq: u64,
    last_load: Option<LoadSummary>,
    pending_viewport: Option<JoinHandle<()>>,
}

impl StoreState {
    fn rederive(&mut self) {
        self.visible = derive_visible_set(
            &self.records,
            &self.filter,
            self.selected_region.as_ref(),
            self.viewport.as_ref(),
            &self.jurisdiction,
        );
    }
}

struct Inner {
    state: Mutex<StoreState>,
    source: Arc<dyn DocumentSource>,
    normalizer: Normalizer,
    reconciler: Reconciler,
    profiles: Option<Arc<dyn ProfileResolver>>,
    config: StoreConfig,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes a load from the in-flight set when its future is dropped early.
struct InFlight<'a> {
    inner: &'a Inner,
    seq: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.inner.lock();
        if state.in_flight.remove(&self.seq) {
            log::warn!("Load #{} was cancelled before it finished", self.seq);
            if state.in_flight.is_empty() {
                state.load_state = LoadState::Ready;
            }
        }
    }
}

struct Snapshot {
    records: Vec<PhotoRecord>,
    jurisdiction: Option<Jurisdiction>,
    summary: LoadSummary,
}

/// Builds a [`PhotoStore`].
pub struct PhotoStoreBuilder {
    source: Arc<dyn DocumentSource>,
    reconciler: Reconciler,
    normalizer: Normalizer,
    profiles: Option<Arc<dyn ProfileResolver>>,
    config: StoreConfig,
    jurisdiction: Jurisdiction,
}

impl PhotoStoreBuilder {
    /// Uses a custom normalizer (e.g. with a TOML alias table).
    #[must_use]
    pub fn normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Resolves the caller's jurisdiction from their profile on every load.
    #[must_use]
    pub fn profile_resolver(mut self, profiles: Arc<dyn ProfileResolver>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    /// Sets the tuning knobs.
    #[must_use]
    pub const fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the initial jurisdiction (unrestricted by default).
    #[must_use]
    pub fn jurisdiction(mut self, jurisdiction: Jurisdiction) -> Self {
        self.jurisdiction = jurisdiction;
        self
    }

    /// Creates the store. No load is started.
    #[must_use]
    pub fn build(self) -> PhotoStore {
        PhotoStore {
            inner: Arc::new(Inner {
                state: Mutex::new(StoreState {
                    load_state: LoadState::Loading,
                    records: Vec::new(),
                    visible: Vec::new(),
                    filter: FilterState::default(),
                    selected_region: None,
                    viewport: None,
                    jurisdiction: self.jurisdiction,
                    generation: 0,
                    load_seq: 0,
                    in_flight: BTreeSet::new(),
                    settled_seq: 0,
                    last_load: None,
                    pending_viewport: None,
                }),
                source: self.source,
                normalizer: self.normalizer,
                reconciler: self.reconciler,
                profiles: self.profiles,
                config: self.config,
            }),
        }
    }
}

/// Shared handle to the loaded photo snapshot. Clones share state.
#[derive(Clone)]
pub struct PhotoStore {
    inner: Arc<Inner>,
}

impl PhotoStore {
    /// Starts building a store over a document source and override
    /// reconciler.
    #[must_use]
    pub fn builder(source: Arc<dyn DocumentSource>, reconciler: Reconciler) -> PhotoStoreBuilder {
        PhotoStoreBuilder {
            source,
            reconciler,
            normalizer: Normalizer::default(),
            profiles: None,
            config: StoreConfig::default(),
            jurisdiction: Jurisdiction::Unrestricted,
        }
    }

    // ── Loading ─────────────────────────────────────────────────

    /// Fetches a fresh snapshot, replacing the current one.
    ///
    /// Override-read failures are logged and the snapshot is loaded
    /// without overrides. If a newer load starts and completes, this one's
    /// result is discarded. Dropping the returned future before it
    /// finishes leaves the current snapshot in place.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Source`] if the export cannot be fetched or
    /// has an unrecognized shape. The store is back in
    /// [`LoadState::Ready`] with its previous snapshot by then.
    pub async fn load(&self) -> Result<LoadSummary, StoreError> {
        let seq = {
            let mut state = self.inner.lock();
            state.load_seq += 1;
            let seq = state.load_seq;
            state.in_flight.insert(seq);
            state.load_state = LoadState::Loading;
            seq
        };
        let _in_flight = InFlight {
            inner: &self.inner,
            seq,
        };
        log::info!(
            "Loading photos from {} (load #{seq})",
            self.inner.source.label()
        );

        let result = self.fetch_snapshot().await;

        let mut state = self.inner.lock();
        state.in_flight.remove(&seq);
        if state.in_flight.is_empty() {
            state.load_state = LoadState::Ready;
        }
        let newer_running = state.in_flight.iter().any(|&other| other > seq);
        if seq < state.settled_seq || newer_running {
            log::info!("Discarding load #{seq}: superseded by a newer load");
            return result.map(|snapshot| snapshot.summary);
        }
        state.settled_seq = seq;

        match result {
            Ok(snapshot) => {
                state.records = snapshot.records;
                state.generation += 1;
                if let Some(jurisdiction) = snapshot.jurisdiction {
                    state.jurisdiction = jurisdiction;
                }
                state.last_load = Some(snapshot.summary);
                state.rederive();
                log::info!(
                    "Loaded {} photos ({} visible)",
                    state.records.len(),
                    state.visible.len()
                );
                Ok(snapshot.summary)
            }
            Err(e) => {
                log::error!(
                    "Error loading photos: {e}; keeping {} previously loaded photos",
                    state.records.len()
                );
                Err(e)
            }
        }
    }

    /// Same as [`Self::load`].
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub async fn reload(&self) -> Result<LoadSummary, StoreError> {
        self.load().await
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot, StoreError> {
        let document = self.inner.source.fetch_documents().await?;
        let normalized = self.inner.normalizer.normalize(&document)?;

        let total = normalized.records.len();
        let mut records = dedupe_ids(normalized.records);
        let duplicates_dropped = total - records.len();

        let overrides = match self.inner.reconciler.load_overrides().await {
            Ok(overrides) => overrides,
            Err(e) => {
                log::warn!("Error fetching priority overrides: {e}; continuing without overrides");
                std::collections::BTreeMap::new()
            }
        };
        let overrides_applied = apply_overrides(&mut records, &overrides);

        let jurisdiction = match &self.inner.profiles {
            Some(profiles) => Some(resolve_jurisdiction(profiles.as_ref()).await),
            None => None,
        };

        Ok(Snapshot {
            summary: LoadSummary {
                records: records.len(),
                duplicates_dropped,
                overrides_applied,
            },
            records,
            jurisdiction,
        })
    }

    // ── Reads ───────────────────────────────────────────────────

    /// The filtered records, in load order.
    #[must_use]
    pub fn visible_photos(&self) -> Vec<PhotoRecord> {
        self.inner.lock().visible.clone()
    }

    /// Every record in the current snapshot, in load order.
    #[must_use]
    pub fn all_photos(&self) -> Vec<PhotoRecord> {
        self.inner.lock().records.clone()
    }

    /// Returns `true` while a load is in flight (and before the first one
    /// finishes).
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.lock().load_state == LoadState::Loading
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn load_state(&self) -> LoadState {
        self.inner.lock().load_state
    }

    /// Counts from the last committed load.
    #[must_use]
    pub fn last_load(&self) -> Option<LoadSummary> {
        self.inner.lock().last_load
    }

    /// Current filters.
    #[must_use]
    pub fn filter_state(&self) -> FilterState {
        self.inner.lock().filter.clone()
    }

    /// Current drawn selection.
    #[must_use]
    pub fn selected_region(&self) -> Option<BoundingBox> {
        self.inner.lock().selected_region
    }

    /// Latest reported viewport (the visible set may lag it by the
    /// debounce period).
    #[must_use]
    pub fn viewport(&self) -> Option<BoundingBox> {
        self.inner.lock().viewport
    }

    /// Current jurisdiction.
    #[must_use]
    pub fn jurisdiction(&self) -> Jurisdiction {
        self.inner.lock().jurisdiction.clone()
    }

    // ── Filter inputs ───────────────────────────────────────────

    /// Merges a partial filter update and re-derives.
    pub fn update_filters(&self, update: FilterUpdate) {
        let mut state = self.inner.lock();
        update.apply_to(&mut state.filter);
        state.rederive();
    }

    /// Resets all filters and the drawn selection, then re-derives.
    pub fn clear_filters(&self) {
        let mut state = self.inner.lock();
        state.filter = FilterState::default();
        state.selected_region = None;
        state.rederive();
    }

    /// Sets or clears the drawn selection and re-derives.
    pub fn set_selected_region(&self, region: Option<BoundingBox>) {
        let mut state = self.inner.lock();
        state.selected_region = region;
        state.rederive();
    }

    /// Sets the caller's jurisdiction and re-derives.
    pub fn set_jurisdiction(&self, jurisdiction: Jurisdiction) {
        let mut state = self.inner.lock();
        state.jurisdiction = jurisdiction;
        state.rederive();
    }

    /// Records a viewport change and schedules a re-derivation after the
    /// debounce period, cancelling any pending one.
    ///
    /// Outside a Tokio runtime the re-derivation runs immediately.
    pub fn set_viewport(&self, viewport: Option<BoundingBox>) {
        let mut state = self.inner.lock();
        state.viewport = viewport;
        if let Some(pending) = state.pending_viewport.take() {
            pending.abort();
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            state.rederive();
            return;
        };

        let inner = Arc::clone(&self.inner);
        let debounce = self.inner.config.debounce;
        state.pending_viewport = Some(runtime.spawn(async move {
            tokio::time::sleep(debounce).await;
            let mut state = inner.lock();
            state.pending_viewport = None;
            state.rederive();
        }));
    }

    // ── Priority edits ──────────────────────────────────────────

    /// Sets a photo's priority for the acting user.
    ///
    /// The change is visible immediately and reverted if it cannot be
    /// persisted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Override`] for an unknown photo id, a missing
    /// acting user, or a side-store failure.
    pub async fn set_priority(&self, photo_id: &str, priority: Priority) -> Result<(), StoreError> {
        self.mutate(photo_id, Some(priority)).await
    }

    /// Removes the acting user's priority override for a photo.
    ///
    /// # Errors
    ///
    /// See [`Self::set_priority`].
    pub async fn clear_priority(&self, photo_id: &str) -> Result<(), StoreError> {
        self.mutate(photo_id, None).await
    }

    async fn mutate(&self, photo_id: &str, next: Option<Priority>) -> Result<(), StoreError> {
        let mutation = {
            let mut state = self.inner.lock();
            let generation = state.generation;
            let mutation = PriorityMutation::begin(&mut state.records, generation, photo_id, next)?;
            state.rederive();
            mutation
        };

        if let Err(e) = self.inner.reconciler.persist(mutation.photo_id(), next).await {
            log::error!("Error updating priority of photo {photo_id}: {e}; reverting");
            let mut state = self.inner.lock();
            let generation = state.generation;
            if mutation.revert(&mut state.records, generation) {
                state.rederive();
            }
            return Err(e.into());
        }

        Ok(())
    }
}

/// Keeps the first record for each id, dropping later ones with a warning.
fn dedupe_ids(records: Vec<PhotoRecord>) -> Vec<PhotoRecord> {
    let mut seen = BTreeSet::new();
    records
        .into_iter()
        .filter(|record| {
            let fresh = seen.insert(record.id.clone());
            if !fresh {
                log::warn!("Dropping photo with duplicate id {:?}", record.id);
            }
            fresh
        })
        .collect()
}
