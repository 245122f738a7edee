//! Status Source
//!
//! Fetches raw JSON status documents from the panel backend.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::resources::PinnedSet;

/// Errors from fetching a status document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Backend returned status {0}")]
    Status(u16),

    #[error("Malformed document: {0}")]
    Malformed(String),
}

/// Something that can produce the status document at a path
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<Value, FetchError>;
}

/// Status source backed by the panel's HTTP API
pub struct HttpStatusSource {
    client: Client,
    base_url: String,
}

impl HttpStatusSource {
    /// Create a source rooted at `base_url`; every request gives up after `timeout`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        // Status must always be live, never a cached copy
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .user_agent(concat!("Lookout/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch(&self, path: &str) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

/// Fetch the set of friends pinned for online/offline notifications
pub async fn load_pinned_set(source: &dyn StatusSource, path: &str) -> Result<PinnedSet, FetchError> {
    let raw = source.fetch(path).await?;
    PinnedSet::from_document(&raw)
}
