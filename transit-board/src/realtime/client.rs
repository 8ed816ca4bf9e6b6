//! HTTP feed source.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use super::aggregate::FeedSource;
use super::error::FeedError;
use super::types::FeedSnapshot;

/// Largest payload accepted from one feed (50 MB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Configuration for one HTTP feed.
#[derive(Debug, Clone)]
pub struct FeedClientConfig {
    pub url: String,
    /// Sent as `x-api-key` when set
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub max_payload_bytes: usize,
}

impl FeedClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            timeout_secs: 30,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_max_payload(mut self, bytes: usize) -> Self {
        self.max_payload_bytes = bytes;
        self
    }
}

/// A GTFS-realtime endpoint polled over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    name: String,
    url: String,
    http: reqwest::Client,
    max_payload_bytes: usize,
}

impl HttpFeedSource {
    pub fn new(config: FeedClientConfig) -> Result<Self, FeedError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key).map_err(|_| FeedError::Api {
                status: 0,
                message: "Invalid API key format".to_string(),
            })?;
            headers.insert("x-api-key", value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            name: feed_name(&config.url),
            url: config.url,
            http,
            max_payload_bytes: config.max_payload_bytes,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_payload(&self) -> Result<Vec<u8>, FeedError> {
        let mut response = self.http.get(&self.url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(FeedError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FeedError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Api {
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        let limit = self.max_payload_bytes;
        if response
            .content_length()
            .is_some_and(|len| len > limit as u64)
        {
            return Err(FeedError::TooLarge { limit });
        }

        let mut payload = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if payload.len() + chunk.len() > limit {
                return Err(FeedError::TooLarge { limit });
            }
            payload.extend_from_slice(&chunk);
        }
        Ok(payload)
    }
}

impl FeedSource for HttpFeedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<FeedSnapshot, FeedError> {
        let payload = self.fetch_payload().await?;
        let snapshot = FeedSnapshot::decode(self.name.clone(), &payload)?;
        debug!(
            source = %self.name,
            bytes = payload.len(),
            trip_updates = snapshot.trip_updates.len(),
            "Fetched feed"
        );
        Ok(snapshot)
    }
}

/// Short name for a feed URL: its last path segment, with an encoded
/// `nyct/` style prefix removed.
pub fn feed_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or(path);
    let segment = match segment.rfind("%2F").or_else(|| segment.rfind("%2f")) {
        Some(pos) => &segment[pos + 3..],
        None => segment,
    };
    if segment.is_empty() {
        url.to_string()
    } else {
        segment.to_string()
    }
}
