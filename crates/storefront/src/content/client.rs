//! `reqwest` implementation of [`ContentApi`].

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

use super::{ContentApi, ContentError};
use crate::config::ContentConfig;

/// Longest body excerpt kept in errors and logs.
const BODY_EXCERPT_CHARS: usize = 200;

/// Client for the content backend's REST API.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct ContentClient {
    inner: Arc<ContentClientInner>,
}

struct ContentClientInner {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<SecretString>,
}

impl std::fmt::Debug for ContentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentClient")
            .field("endpoint", &self.inner.endpoint)
            .field(
                "api_token",
                &self.inner.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl ContentClient {
    /// Create a new content API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend
    /// initialization failure).
    pub fn new(config: &ContentConfig) -> Result<Self, ContentError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ContentClientInner {
                client,
                endpoint: config.endpoint(),
                api_token: config.api_token.clone(),
            }),
        })
    }

    /// Root URL every request path is appended to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.inner.endpoint, path.trim_start_matches('/'))
    }
}

impl ContentApi for ContentClient {
    #[instrument(skip(self), fields(endpoint = %self.inner.endpoint))]
    async fn get_json(&self, path: &str) -> Result<serde_json::Value, ContentError> {
        let url = self.url_for(path);

        let mut request = self.inner.client.get(&url);
        if let Some(token) = &self.inner.api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ContentError::RateLimited(retry_after));
        }

        // Read as text first so failures can log what the backend actually sent
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %excerpt(&body),
                "Content API returned non-success status"
            );
            return Err(ContentError::Status {
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }

        let json: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %excerpt(&body),
                "Failed to parse content API response"
            );
            ContentError::Parse(e)
        })?;

        debug!(url = %url, "Content API request complete");
        Ok(json)
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}
