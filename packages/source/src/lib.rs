#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Bulk photo document sources and record normalization.
//!
//! A [`DocumentSource`] returns the raw photo export in one request (a
//! `GeoJSON` feature collection or a bare JSON array). The [`normalize`]
//! module maps that document into canonical
//! [`damage_map_photo_models::PhotoRecord`]s using an ordered alias table
//! per field, so exports from different survey tools can be ingested
//! without per-tool code.

pub mod aliases;
pub mod file;
pub mod http;
pub mod normalize;
pub mod parsing;
pub mod retry;
pub mod s3;

use std::time::Duration;

use async_trait::async_trait;

pub use aliases::{FieldAliases, parse_alias_toml};
pub use normalize::{Normalized, Normalizer, normalize};

/// Errors that can occur while fetching or normalizing photo documents.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is neither a feature collection nor a JSON array.
    #[error("Unrecognized document format: {message}")]
    Format {
        /// Description of what was received.
        message: String,
    },

    /// The source responded, but with an error or unusable status.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of what went wrong.
        message: String,
    },

    /// Missing required environment variable.
    #[error("Missing environment variable: {name}")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: String,
    },

    /// S3 `GetObject` failed.
    #[error("Failed to download s3://{bucket}/{key}: {source}")]
    Download {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The alias table TOML is malformed.
    #[error("Invalid alias table: {0}")]
    Aliases(#[from] toml::de::Error),
}

/// Anything that can hand back the full photo export in one request.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Short label used in log messages (e.g. `"s3://bucket/key"`).
    fn label(&self) -> &str;

    /// Fetches the raw export document.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the source is unreachable or the payload
    /// is not JSON.
    async fn fetch_documents(&self) -> Result<serde_json::Value, SourceError>;
}

/// Builds the shared HTTP client used by [`http::HttpDocumentSource`].
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the TLS backend fails to initialize.
pub fn build_http_client() -> Result<reqwest::Client, SourceError> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("damage-map/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(120))
        .connect_timeout(Duration::from_secs(30))
        .build()?)
}

pub(crate) fn require_env(name: &str) -> Result<String, SourceError> {
    std::env::var(name).map_err(|_| SourceError::MissingEnv {
        name: name.to_string(),
    })
}
