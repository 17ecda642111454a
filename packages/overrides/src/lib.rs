#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-user priority overrides.
//!
//! The bulk photo export is immutable; a user's triage decisions live in a
//! separate side-store keyed on `(photo_id, user_id)` and are joined onto
//! the normalized records at read time. This crate owns the join
//! ([`merge`]) and the optimistic write path ([`mutation`]), and defines
//! the seams to the side-store ([`OverrideStore`]) and to the identity
//! provider ([`IdentityResolver`]).

pub mod merge;
pub mod mutation;

use async_trait::async_trait;
use damage_map_photo_models::PriorityOverride;
use serde::{Deserialize, Serialize};

pub use merge::{apply_overrides, collect_overrides};
pub use mutation::{PriorityMutation, Reconciler};

/// Environment variable holding the acting user's id.
pub const USER_ID_ENV: &str = "DAMAGE_MAP_USER_ID";

/// Errors that can occur while reading or writing overrides.
#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    /// The side-store failed.
    #[error("Database error: {0}")]
    Database(String),

    /// No acting user could be resolved.
    #[error("User not authenticated")]
    Unauthenticated,

    /// No record in the loaded snapshot has this id.
    #[error("Photo not found: {id}")]
    PhotoNotFound {
        /// The requested photo id.
        id: String,
    },
}

/// An override row as persisted. The priority is kept as stored text so
/// that readers can skip values they do not recognize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredOverride {
    /// Photo key as written.
    pub photo_id: String,
    /// Owning user.
    pub user_id: String,
    /// Priority text.
    pub priority: String,
}

/// The mutable side-store holding priority overrides.
#[async_trait]
pub trait OverrideStore: Send + Sync {
    /// Reads every override row.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideError::Database`] if the read fails.
    async fn select_all(&self) -> Result<Vec<StoredOverride>, OverrideError>;

    /// Inserts or replaces the row for `(photo_id, user_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideError::Database`] if the write fails.
    async fn upsert(&self, row: &PriorityOverride) -> Result<(), OverrideError>;

    /// Deletes the row for `(photo_id, user_id)`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideError::Database`] if the write fails.
    async fn delete(&self, photo_id: &str, user_id: &str) -> Result<(), OverrideError>;
}

/// Resolves the acting user.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Returns the current user's id.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideError::Unauthenticated`] if nobody is signed in.
    async fn current_user_id(&self) -> Result<String, OverrideError>;
}

/// An identity fixed at construction, typically from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticIdentity(Option<String>);

impl StaticIdentity {
    /// An identity that always resolves to `user_id`.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self(Some(user_id.into()))
    }

    /// An identity that never resolves.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self(None)
    }

    /// Reads the user id from `DAMAGE_MAP_USER_ID`. Unset or blank means
    /// anonymous.
    #[must_use]
    pub fn from_env() -> Self {
        Self(
            std::env::var(USER_ID_ENV)
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        )
    }

    /// The configured user id, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentity {
    async fn current_user_id(&self) -> Result<String, OverrideError> {
        self.0.clone().ok_or(OverrideError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_identity() {
        assert_eq!(
            StaticIdentity::new("u1").current_user_id().await.unwrap(),
            "u1"
        );
        assert!(matches!(
            StaticIdentity::anonymous().current_user_id().await,
            Err(OverrideError::Unauthenticated)
        ));
        assert_eq!(StaticIdentity::new("u1").user_id(), Some("u1"));
        assert_eq!(StaticIdentity::anonymous().user_id(), None);
    }
}
