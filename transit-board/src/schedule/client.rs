//! Static schedule retrieval.
//!
//! Downloads (or reads) the timetable archive and decodes it into an
//! indexed [`Schedule`].

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, info};

use super::archive::{ScheduleTables, read_archive};
use super::error::ScheduleError;
use super::index::Schedule;

/// Default archive: NYCT subway, supplemented with upcoming service changes.
pub const DEFAULT_SCHEDULE_URL: &str =
    "https://rrgtfsfeeds.s3.amazonaws.com/gtfs_supplemented.zip";

/// Where the archive comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleLocation {
    Url(String),
    Path(PathBuf),
}

impl std::fmt::Display for ScheduleLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleLocation::Url(url) => f.write_str(url),
            ScheduleLocation::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Configuration for the schedule client.
#[derive(Debug, Clone)]
pub struct ScheduleClientConfig {
    pub location: ScheduleLocation,
    /// Sent as `x-api-key` when set
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ScheduleClientConfig {
    pub fn new(location: ScheduleLocation) -> Self {
        Self {
            location,
            api_key: None,
            timeout_secs: 30,
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
}

impl Default for ScheduleClientConfig {
    fn default() -> Self {
        Self::new(ScheduleLocation::Url(DEFAULT_SCHEDULE_URL.to_string()))
    }
}

/// Fetches and decodes the static timetable.
#[derive(Debug, Clone)]
pub struct ScheduleClient {
    http: reqwest::Client,
    location: ScheduleLocation,
}

impl ScheduleClient {
    pub fn new(config: ScheduleClientConfig) -> Result<Self, ScheduleError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key).map_err(|_| ScheduleError::Api {
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
            http,
            location: config.location,
        })
    }

    pub fn location(&self) -> &ScheduleLocation {
        &self.location
    }

    /// Raw archive bytes.
    pub async fn fetch_archive(&self) -> Result<Vec<u8>, ScheduleError> {
        match &self.location {
            ScheduleLocation::Path(path) => {
                debug!(path = %path.display(), "Reading schedule archive");
                Ok(tokio::fs::read(path).await?)
            }
            ScheduleLocation::Url(url) => {
                debug!(%url, "Downloading schedule archive");
                let response = self.http.get(url).send().await?;
                let status = response.status();

                if status == reqwest::StatusCode::UNAUTHORIZED {
                    return Err(ScheduleError::Unauthorized);
                }

                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ScheduleError::Api {
                        status: status.as_u16(),
                        message: body.chars().take(500).collect(),
                    });
                }

                Ok(response.bytes().await?.to_vec())
            }
        }
    }

    /// Fetch the archive and decode its tables on a blocking thread.
    pub async fn fetch_tables(&self) -> Result<ScheduleTables, ScheduleError> {
        let bytes = self.fetch_archive().await?;
        let size = bytes.len();

        let tables = tokio::task::spawn_blocking(move || read_archive(&bytes))
            .await
            .map_err(|e| ScheduleError::Task(e.to_string()))??;

        info!(bytes = size, source = %self.location, "Fetched schedule");
        Ok(tables)
    }

    /// Fetch, decode and index the timetable.
    pub async fn fetch(&self) -> Result<Schedule, ScheduleError> {
        Ok(Schedule::new(self.fetch_tables().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::archive::tests::full_archive;

    #[test]
    fn config_builder() {
        let config = ScheduleClientConfig::default()
            .with_api_key("secret")
            .with_timeout(5);

        assert_eq!(
            config.location,
            ScheduleLocation::Url(DEFAULT_SCHEDULE_URL.to_string())
        );
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn invalid_api_key_is_rejected() {
        let config = ScheduleClientConfig::default().with_api_key("bad\nkey");
        assert!(ScheduleClient::new(config).is_err());
    }

    #[tokio::test]
    async fn reads_archive_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gtfs.zip");
        std::fs::write(&path, full_archive()).unwrap();

        let client =
            ScheduleClient::new(ScheduleClientConfig::new(ScheduleLocation::Path(path))).unwrap();
        let schedule = client.fetch().await.unwrap();

        assert_eq!(schedule.stations().len(), 2);
        assert_eq!(schedule.stop_name("A46N"), Some("Utica Av"));
    }

    #[tokio::test]
    async fn missing_path_is_io_error() {
        let client = ScheduleClient::new(ScheduleClientConfig::new(ScheduleLocation::Path(
            PathBuf::from("/nonexistent/gtfs.zip"),
        )))
        .unwrap();

        let err = client.fetch().await.unwrap_err();
        assert!(matches!(err, ScheduleError::Io(_)));
    }
}
