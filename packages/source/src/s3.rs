//! Photo export stored as a single JSON object in S3.
//!
//! # Environment Variables
//!
//! | Variable | Required | Description |
//! |---|---|---|
//! | `AWS_REGION` | Yes | Bucket region |
//! | `S3_BUCKET_NAME` | Yes | Bucket holding the export |
//! | `S3_OBJECT_KEY` | Yes | Key of the export object |
//! | `AWS_ACCESS_KEY_ID` | Yes | Access key |
//! | `AWS_SECRET_ACCESS_KEY` | Yes | Secret key |
//! | `AWS_ENDPOINT_URL` | No | Custom endpoint for S3-compatible stores |

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;

use crate::{DocumentSource, SourceError, require_env};

/// Fetches the photo export with one `GetObject` call.
pub struct S3DocumentSource {
    client: aws_sdk_s3::Client,
    bucket: String,
    key: String,
    label: String,
}

impl S3DocumentSource {
    /// Creates a source for `s3://{bucket}/{key}` using an existing client.
    #[must_use]
    pub fn new(client: aws_sdk_s3::Client, bucket: String, key: String) -> Self {
        let label = format!("s3://{bucket}/{key}");
        Self {
            client,
            bucket,
            key,
            label,
        }
    }

    /// Creates a source from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingEnv`] if any required variable is unset.
    pub fn from_env() -> Result<Self, SourceError> {
        let region = require_env("AWS_REGION")?;
        let bucket = require_env("S3_BUCKET_NAME")?;
        let key = require_env("S3_OBJECT_KEY")?;
        let access_key = require_env("AWS_ACCESS_KEY_ID")?;
        let secret_key = require_env("AWS_SECRET_ACCESS_KEY")?;

        let creds = Credentials::new(&access_key, &secret_key, None, None, "damage-map-env");

        let mut builder = aws_sdk_s3::Config::builder()
            .region(Region::new(region))
            .credentials_provider(creds);
        if let Ok(endpoint) = std::env::var("AWS_ENDPOINT_URL") {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self::new(
            aws_sdk_s3::Client::from_conf(builder.build()),
            bucket,
            key,
        ))
    }

    fn download_error(&self, source: Box<dyn std::error::Error + Send + Sync>) -> SourceError {
        SourceError::Download {
            bucket: self.bucket.clone(),
            key: self.key.clone(),
            source,
        }
    }
}

#[async_trait]
impl DocumentSource for S3DocumentSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch_documents(&self) -> Result<serde_json::Value, SourceError> {
        log::info!("Fetching photo export from {}", self.label);

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await
            .map_err(|e| self.download_error(Box::new(e)))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| self.download_error(Box::new(e)))?
            .into_bytes();

        #[allow(clippy::cast_precision_loss)]
        let kb = bytes.len() as f64 / 1024.0;
        log::info!("  downloaded {} ({kb:.1} KB)", self.label);

        Ok(serde_json::from_slice(&bytes)?)
    }
}
