//! The `photo_priorities` table.

use std::sync::Arc;

use async_trait::async_trait;
use damage_map_overrides::{OverrideError, OverrideStore, StoredOverride};
use damage_map_photo_models::{PriorityOverride, normalize_key};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

/// [`OverrideStore`] backed by the `photo_priorities` table.
#[derive(Clone)]
pub struct SqliteOverrideStore {
    db: Arc<dyn Database>,
}

impl SqliteOverrideStore {
    /// Wraps an open side-store database.
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OverrideStore for SqliteOverrideStore {
    async fn select_all(&self) -> Result<Vec<StoredOverride>, OverrideError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT photo_id, user_id, priority FROM photo_priorities
                 ORDER BY id",
                &[],
            )
            .await
            .map_err(|e| OverrideError::Database(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| StoredOverride {
                photo_id: row.to_value("photo_id").unwrap_or_default(),
                user_id: row.to_value("user_id").unwrap_or_default(),
                priority: row.to_value("priority").unwrap_or_default(),
            })
            .collect())
    }

    async fn upsert(&self, row: &PriorityOverride) -> Result<(), OverrideError> {
        self.db
            .exec_raw_params(
                "INSERT INTO photo_priorities (photo_id, user_id, priority)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (photo_id, user_id) DO UPDATE SET
                     priority = excluded.priority,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                &[
                    DatabaseValue::String(normalize_key(&row.photo_id)),
                    DatabaseValue::String(row.user_id.clone()),
                    DatabaseValue::String(row.priority.to_string()),
                ],
            )
            .await
            .map_err(|e| OverrideError::Database(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, photo_id: &str, user_id: &str) -> Result<(), OverrideError> {
        self.db
            .exec_raw_params(
                "DELETE FROM photo_priorities WHERE photo_id = $1 AND user_id = $2",
                &[
                    DatabaseValue::String(normalize_key(photo_id)),
                    DatabaseValue::String(user_id.to_string()),
                ],
            )
            .await
            .map_err(|e| OverrideError::Database(e.to_string()))?;

        Ok(())
    }
}
