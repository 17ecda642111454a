//! Photo export read from a local JSON file.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::{DocumentSource, SourceError};

/// Reads the photo export from disk.
pub struct FileDocumentSource {
    path: PathBuf,
    label: String,
}

impl FileDocumentSource {
    /// Creates a source reading `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path.display().to_string();
        Self { path, label }
    }
}

#[async_trait]
impl DocumentSource for FileDocumentSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch_documents(&self) -> Result<serde_json::Value, SourceError> {
        log::info!("Reading photo export from {}", self.label);
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_json_file() {
        let path = std::env::temp_dir().join(format!(
            "damage_map_file_source_{}.json",
            std::process::id()
        ));
        tokio::fs::write(&path, br#"[{"id": "a"}]"#).await.unwrap();

        let source = FileDocumentSource::new(&path);
        let document = source.fetch_documents().await.unwrap();
        assert_eq!(document, serde_json::json!([{"id": "a"}]));

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let source = FileDocumentSource::new("/nonexistent/damage_map/photos.json");
        let err = source.fetch_documents().await.unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }
}
