//! The `profiles` table: which jurisdiction each user may see.

use std::sync::Arc;

use async_trait::async_trait;
use damage_map_geography::{GeographyError, ProfileResolver};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// [`ProfileResolver`] reading one user's `location` from `profiles`.
#[derive(Clone)]
pub struct SqliteProfileResolver {
    db: Arc<dyn Database>,
    user_id: Option<String>,
}

impl SqliteProfileResolver {
    /// Resolves the profile of `user_id`. `None` (no acting user) always
    /// resolves to no profile.
    #[must_use]
    pub fn new(db: Arc<dyn Database>, user_id: Option<String>) -> Self {
        Self { db, user_id }
    }
}

#[async_trait]
impl ProfileResolver for SqliteProfileResolver {
    async fn jurisdiction_name(&self) -> Result<Option<String>, GeographyError> {
        let Some(user_id) = &self.user_id else {
            return Ok(None);
        };
        get_location(self.db.as_ref(), user_id)
            .await
            .map_err(|e| GeographyError::Profile(e.to_string()))
    }
}

/// Reads a user's jurisdiction name.
///
/// # Errors
///
/// Returns [`DbError::Database`] if the query fails.
pub async fn get_location(db: &dyn Database, user_id: &str) -> Result<Option<String>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT location FROM profiles WHERE user_id = $1",
            &[DatabaseValue::String(user_id.to_string())],
        )
        .await
        .map_err(|e| DbError::Database(e.to_string()))?;

    let Some(row) = rows.first() else {
        return Ok(None);
    };
    let location: Option<String> = row.to_value("location").unwrap_or(None);

    Ok(location.filter(|location| !location.trim().is_empty()))
}

/// Assigns a user's jurisdiction name, creating the profile if needed.
///
/// # Errors
///
/// Returns [`DbError::Database`] if the write fails.
pub async fn set_location(db: &dyn Database, user_id: &str, location: &str) -> Result<(), DbError> {
    db.exec_raw_params(
        "INSERT INTO profiles (user_id, location)
         VALUES ($1, $2)
         ON CONFLICT (user_id) DO UPDATE SET location = excluded.location",
        &[
            DatabaseValue::String(user_id.to_string()),
            DatabaseValue::String(location.to_string()),
        ],
    )
    .await
    .map_err(|e| DbError::Database(e.to_string()))?;

    log::info!("Set jurisdiction of user {user_id} to {location:?}");
    Ok(())
}
