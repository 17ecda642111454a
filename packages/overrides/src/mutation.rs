//! Optimistic priority writes with rollback.
//!
//! A write is split into three phases so that callers holding records
//! behind a lock can release it while the side-store round-trip is in
//! flight:
//!
//! 1. [`PriorityMutation::begin`] captures the record's current priority
//!    and writes the new one into memory.
//! 2. [`Reconciler::persist`] upserts or deletes the side-store row.
//! 3. On failure, [`PriorityMutation::revert`] restores the captured value.
//!
//! Records live in numbered snapshots (one per load). A mutation remembers
//! the snapshot it was applied to and a revert against any other snapshot
//! does nothing.

use std::collections::BTreeMap;
use std::sync::Arc;

use damage_map_photo_models::{PhotoRecord, Priority, PriorityOverride, normalize_key};

use crate::merge::collect_overrides;
use crate::{IdentityResolver, OverrideError, OverrideStore};

/// One in-flight priority change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityMutation {
    photo_id: String,
    previous: Option<Priority>,
    next: Option<Priority>,
    generation: u64,
}

fn find_record<'a>(records: &'a mut [PhotoRecord], key: &str) -> Option<&'a mut PhotoRecord> {
    records.iter_mut().find(|r| normalize_key(&r.id) == key)
}

impl PriorityMutation {
    /// Snapshots the current priority of `photo_id` in snapshot
    /// `generation` and applies `next` in place. `None` clears it.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideError::PhotoNotFound`] if no record has this id;
    /// nothing is modified in that case.
    pub fn begin(
        records: &mut [PhotoRecord],
        generation: u64,
        photo_id: &str,
        next: Option<Priority>,
    ) -> Result<Self, OverrideError> {
        let key = normalize_key(photo_id);
        let record = find_record(records, &key).ok_or_else(|| OverrideError::PhotoNotFound {
            id: photo_id.to_string(),
        })?;

        let previous = record.priority;
        record.priority = next;

        Ok(Self {
            photo_id: key,
            previous,
            next,
            generation,
        })
    }

    /// Canonical key of the mutated photo.
    #[must_use]
    pub fn photo_id(&self) -> &str {
        &self.photo_id
    }

    /// Priority before the mutation.
    #[must_use]
    pub const fn previous(&self) -> Option<Priority> {
        self.previous
    }

    /// Priority the mutation writes.
    #[must_use]
    pub const fn next(&self) -> Option<Priority> {
        self.next
    }

    /// Snapshot the mutation was applied to.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Restores the captured priority if `generation` is still the
    /// snapshot this mutation was applied to. Returns `true` if a record
    /// was restored.
    pub fn revert(&self, records: &mut [PhotoRecord], generation: u64) -> bool {
        if generation != self.generation {
            log::debug!(
                "Skipping revert of photo {}: snapshot {} replaced by {generation}",
                self.photo_id,
                self.generation
            );
            return false;
        }
        match find_record(records, &self.photo_id) {
            Some(record) => {
                record.priority = self.previous;
                true
            }
            None => false,
        }
    }
}

/// Reads and writes overrides for the acting user.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn OverrideStore>,
    identity: Arc<dyn IdentityResolver>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Creates a reconciler over a side-store and identity provider.
    #[must_use]
    pub fn new(store: Arc<dyn OverrideStore>, identity: Arc<dyn IdentityResolver>) -> Self {
        Self { store, identity }
    }

    /// Reads the acting user's overrides as a lookup map.
    ///
    /// Rows owned by other users are ignored. Without an acting user there
    /// is nothing to apply and the map is empty.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideError::Database`] if the side-store read fails.
    pub async fn load_overrides(&self) -> Result<BTreeMap<String, Priority>, OverrideError> {
        let user_id = match self.identity.current_user_id().await {
            Ok(user_id) => user_id,
            Err(OverrideError::Unauthenticated) => {
                log::info!("No acting user; skipping priority overrides");
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(e),
        };

        let mut rows = self.store.select_all().await?;
        rows.retain(|row| row.user_id == user_id);
        log::info!("Loaded {} priority overrides for user {user_id}", rows.len());

        Ok(collect_overrides(&rows))
    }

    /// Persists `priority` for `photo_id` as the acting user: an upsert for
    /// `Some`, a delete for `None`.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideError::Unauthenticated`] if no user resolves, or
    /// [`OverrideError::Database`] if the write fails.
    pub async fn persist(
        &self,
        photo_id: &str,
        priority: Option<Priority>,
    ) -> Result<(), OverrideError> {
        let user_id = self.identity.current_user_id().await?;
        let photo_id = normalize_key(photo_id);

        match priority {
            Some(priority) => {
                log::info!("Saving priority {priority} for photo {photo_id} (user {user_id})");
                self.store
                    .upsert(&PriorityOverride {
                        photo_id,
                        user_id,
                        priority,
                    })
                    .await
            }
            None => {
                log::info!("Clearing priority for photo {photo_id} (user {user_id})");
                self.store.delete(&photo_id, &user_id).await
            }
        }
    }

    /// Runs a full mutation against records the caller holds exclusively:
    /// apply, persist, and revert on failure.
    ///
    /// # Errors
    ///
    /// Returns the error from [`PriorityMutation::begin`] or
    /// [`Self::persist`]; in the latter case the record is restored first.
    pub async fn mutate(
        &self,
        records: &mut [PhotoRecord],
        photo_id: &str,
        next: Option<Priority>,
    ) -> Result<(), OverrideError> {
        let mutation = PriorityMutation::begin(records, 0, photo_id, next)?;
        if let Err(e) = self.persist(mutation.photo_id(), next).await {
            log::error!("Failed to persist priority for photo {photo_id}: {e}");
            mutation.revert(records, 0);
            return Err(e);
        }
        Ok(())
    }
}
