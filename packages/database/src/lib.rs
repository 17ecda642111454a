#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `SQLite` side-store for priority overrides and caller profiles.
//!
//! Everything the application writes lives here: one row per
//! `(photo_id, user_id)` priority override, and one profile row per user
//! naming the jurisdiction they may see. The photo export itself is never
//! written.
//!
//! Uses `switchy_database` for all database operations.

pub mod overrides;
pub mod profiles;

use std::path::Path;
use std::sync::Arc;

use switchy_database::Database;
use switchy_database_connection::init_sqlite_rusqlite;

pub use overrides::SqliteOverrideStore;
pub use profiles::SqliteProfileResolver;

/// Default path for the side-store database.
pub const DEFAULT_DB_PATH: &str = "data/overrides.db";

/// Environment variable overriding [`DEFAULT_DB_PATH`].
pub const DB_PATH_ENV: &str = "DAMAGE_MAP_DB";

/// Errors from side-store setup.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A database query or command failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opens (or creates) the side-store database and ensures the schema
/// exists.
///
/// # Errors
///
/// Returns [`DbError`] if the database cannot be opened or schema creation
/// fails.
pub async fn open_db(path: &Path) -> Result<Arc<dyn Database>, DbError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = init_sqlite_rusqlite(Some(path)).map_err(|e| DbError::Database(e.to_string()))?;
    ensure_schema(db.as_ref()).await?;
    log::debug!("Opened side-store at {}", path.display());

    Ok(Arc::from(db))
}

/// Creates all tables if they don't already exist.
///
/// # Errors
///
/// Returns [`DbError::Database`] if any statement fails.
pub async fn ensure_schema(db: &dyn Database) -> Result<(), DbError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS photo_priorities (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            photo_id    TEXT NOT NULL,
            user_id     TEXT NOT NULL,
            priority    TEXT NOT NULL,
            updated_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            UNIQUE(photo_id, user_id)
        )",
    )
    .await
    .map_err(|e| DbError::Database(e.to_string()))?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_photo_priorities_user
         ON photo_priorities (user_id)",
    )
    .await
    .map_err(|e| DbError::Database(e.to_string()))?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS profiles (
            user_id     TEXT PRIMARY KEY,
            location    TEXT NOT NULL
        )",
    )
    .await
    .map_err(|e| DbError::Database(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use switchy_database::Database;

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    /// A fresh database file under the system temp dir, removed on drop.
    pub struct TempDb {
        pub db: Arc<dyn Database>,
        path: PathBuf,
    }

    impl TempDb {
        pub async fn new() -> Self {
            let path = std::env::temp_dir().join(format!(
                "damage_map_db_test_{}_{}.db",
                std::process::id(),
                COUNTER.fetch_add(1, Ordering::SeqCst)
            ));
            let _ = std::fs::remove_file(&path);
            let db = super::open_db(&path).await.unwrap();
            Self { db, path }
        }
    }

    impl Drop for TempDb {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
