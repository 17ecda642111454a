//! Retry with exponential backoff for the document-fetch proxy.
//!
//! [`send_json`] rebuilds the request on every attempt (builders are
//! consumed by `.send()`), so any request shape can be retried:
//!
//! ```ignore
//! let document = retry::send_json(&RetryPolicy::default(), || {
//!     client.get(&url).bearer_auth(&token)
//! })
//! .await?;
//! ```

use std::time::Duration;

use reqwest::StatusCode;

use crate::SourceError;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// How many times, and how patiently, a request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    /// Four retries at 1s, 2s, 4s, 8s.
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}

/// Sends a request and parses the body as JSON, retrying connection
/// failures, timeouts, HTTP 429 and HTTP 5xx.
///
/// Other 4xx statuses are permanent and returned immediately. A body that
/// is not valid JSON is not retried: the proxy either produced the whole
/// export or it did not.
///
/// # Errors
///
/// Returns [`SourceError::Http`] for connection-level failures,
/// [`SourceError::Transport`] for unusable statuses, and
/// [`SourceError::Json`] if the body is not JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(
    policy: &RetryPolicy,
    build_request: F,
) -> Result<serde_json::Value, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_with_retry(policy, &build_request).await?;
    let url = response.url().to_string();
    let status = response.status();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        log::error!(
            "JSON parse failed.\n  \
             url: {url}\n  \
             status: {status}\n  \
             received: {} bytes\n  \
             parse error: {e}\n  \
             body preview: {}",
            text.len(),
            preview(&text),
        );
        SourceError::Json(e)
    })
}

#[allow(clippy::future_not_send)]
async fn send_with_retry<F>(
    policy: &RetryPolicy,
    build_request: &F,
) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            log::warn!("  retry {attempt}/{} in {delay:?}...", policy.max_retries);
            tokio::time::sleep(delay).await;
        }
        let can_retry = attempt < policy.max_retries;
        attempt += 1;

        match build_request().send().await {
            Err(e) if is_transient(&e) && can_retry => {
                log::warn!("  transient error: {e}");
            }
            Err(e) => return Err(SourceError::Http(e)),
            Ok(response) => {
                let status = response.status();
                if status.is_success() || status.is_redirection() {
                    return Ok(response);
                }
                if is_retryable_status(status) && can_retry {
                    log::warn!("  HTTP {status}");
                    continue;
                }
                let body = response.text().await.unwrap_or_default();
                return Err(SourceError::Transport {
                    message: format!("HTTP {status}: {}", preview(&body)),
                });
            }
        }
    }
}

/// Returns `true` for statuses worth retrying (429 and 5xx).
#[must_use]
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

fn preview(text: &str) -> String {
    if text.len() <= BODY_PREVIEW_LEN {
        return text.to_string();
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(4), Duration::from_secs(8));
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::OK));
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(400);
        let shown = preview(&long);
        assert!(shown.ends_with("..."));
        assert!(shown.len() <= BODY_PREVIEW_LEN + 3);
        assert_eq!(preview("short"), "short");
    }
}
