//! Photo export fetched through an HTTP proxy endpoint.
//!
//! The proxy holds the object-store credentials and returns the export
//! body verbatim. On failure it answers with `{"error": "..."}`, which is
//! surfaced as [`SourceError::Transport`].

use async_trait::async_trait;

use crate::retry::{self, RetryPolicy};
use crate::{DocumentSource, SourceError, build_http_client, require_env};

/// Fetches the photo export from the document-fetch proxy.
pub struct HttpDocumentSource {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    policy: RetryPolicy,
}

impl HttpDocumentSource {
    /// Creates a source for `url`, optionally sending a bearer token.
    #[must_use]
    pub fn new(client: reqwest::Client, url: String, token: Option<String>) -> Self {
        Self {
            client,
            url,
            token,
            policy: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Creates a source from `DAMAGE_MAP_PROXY_URL` and the optional
    /// `DAMAGE_MAP_PROXY_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingEnv`] if the URL is unset, or
    /// [`SourceError::Http`] if the client cannot be built.
    pub fn from_env() -> Result<Self, SourceError> {
        let url = require_env("DAMAGE_MAP_PROXY_URL")?;
        let token = std::env::var("DAMAGE_MAP_PROXY_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        Ok(Self::new(build_http_client()?, url, token))
    }
}

/// Rejects proxy error payloads of the form `{"error": ...}`.
///
/// # Errors
///
/// Returns [`SourceError::Transport`] carrying the proxy's message.
pub fn check_proxy_payload(document: serde_json::Value) -> Result<serde_json::Value, SourceError> {
    let Some(error) = document.as_object().and_then(|obj| obj.get("error")) else {
        return Ok(document);
    };
    let message = error
        .as_str()
        .map_or_else(|| error.to_string(), String::from);
    let details = document
        .get("details")
        .and_then(serde_json::Value::as_str)
        .map(|d| format!(" ({d})"))
        .unwrap_or_default();
    Err(SourceError::Transport {
        message: format!("{message}{details}"),
    })
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    fn label(&self) -> &str {
        &self.url
    }

    async fn fetch_documents(&self) -> Result<serde_json::Value, SourceError> {
        log::info!("Fetching photo export from {}", self.url);

        let document = retry::send_json(&self.policy, || {
            let request = self.client.get(&self.url);
            match &self.token {
                Some(token) => request.bearer_auth(token),
                None => request,
            }
        })
        .await?;

        check_proxy_payload(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_exports() {
        let array = serde_json::json!([{"id": 1}]);
        assert_eq!(check_proxy_payload(array.clone()).unwrap(), array);

        let collection = serde_json::json!({"type": "FeatureCollection", "features": []});
        assert_eq!(check_proxy_payload(collection.clone()).unwrap(), collection);
    }

    #[test]
    fn error_payload_is_transport_error() {
        let payload = serde_json::json!({
            "error": "Failed to fetch data from S3",
            "details": "NoSuchKey"
        });
        let err = check_proxy_payload(payload).unwrap_err();
        match err {
            SourceError::Transport { message } => {
                assert_eq!(message, "Failed to fetch data from S3 (NoSuchKey)");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_string_error_is_rendered() {
        let err = check_proxy_payload(serde_json::json!({"error": {"code": 500}})).unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
