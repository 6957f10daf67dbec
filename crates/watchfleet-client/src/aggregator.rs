//! HTTP client for the backend aggregator.
//!
//! The aggregator hands out video listings when the queue drains and collects
//! one result record per attempt.

use serde::{Deserialize, Serialize};
use tracing::debug;

use watchfleet_core::{SessionResult, VideoListing};

use crate::error::ClientError;

/// Body of `GET /videos`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub videos: Vec<VideoListing>,
}

/// Client for the aggregator REST API.
#[derive(Debug, Clone)]
pub struct AggregatorClient {
    inner: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl AggregatorClient {
    /// Create a new aggregator client.
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    /// Send `Authorization: Bearer <key>` with every request.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into()).filter(|k: &String| !k.is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Check if the aggregator is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let url = self.url("/health");
        debug!(url = %url, "Checking aggregator health");

        let response = self.authorize(self.inner.get(&url)).send().await?;
        Ok(response.status().is_success())
    }

    /// Fetch the current list of videos to watch.
    pub async fn fetch_videos(&self) -> Result<Vec<VideoListing>, ClientError> {
        let url = self.url("/videos");
        debug!(url = %url, "Fetching videos");

        let response = self.authorize(self.inner.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status {
                status: response.status().as_u16(),
                path: "/videos".to_string(),
            });
        }

        let body: VideoListResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Serialization(e.to_string()))?;
        Ok(body.videos)
    }

    /// Submit one attempt result.
    pub async fn submit_result(&self, result: &SessionResult) -> Result<(), ClientError> {
        let url = self.url("/results");
        debug!(url = %url, video_id = %result.video_id, "Submitting result");

        let response = self
            .authorize(self.inner.post(&url))
            .json(result)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::Status {
                status: response.status().as_u16(),
                path: "/results".to_string(),
            });
        }
        Ok(())
    }
}
