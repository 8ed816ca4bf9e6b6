//! Service configuration.
//!
//! Defaults target the NYCT subway. Every setting can be overridden from
//! `TRANSIT_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::departures::DEFAULT_HORIZON;
use crate::format::DEFAULT_MAX_UPCOMING;
use crate::realtime::{FeedClientConfig, FeedEndpoint, FeedError, FileFeedSource};
use crate::schedule::{DEFAULT_SCHEDULE_URL, ScheduleClientConfig, ScheduleLocation};

/// NYCT subway realtime feeds, one per line group.
pub const DEFAULT_FEED_URLS: [&str; 8] = [
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-ace",
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-bdfm",
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-g",
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-jz",
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-nqrw",
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-l",
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs",
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs-si",
];

/// Longest timetable look-ahead accepted from configuration, one week.
pub const MAX_HORIZON_MINS: i64 = 7 * 24 * 60;

/// Invalid configuration value.
#[derive(Debug, thiserror::Error)]
#[error("invalid {var}={value:?}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Configuration for the departure board service.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Where the static timetable archive comes from
    pub schedule: ScheduleLocation,
    /// Realtime feed URLs, in the order they are aggregated
    pub feed_urls: Vec<String>,
    /// When set, feeds are read from `*.pb` files here instead of `feed_urls`
    pub feed_dir: Option<PathBuf>,
    /// Sent as `x-api-key` to the schedule and feed endpoints
    pub api_key: Option<String>,
    pub schedule_refresh: Duration,
    pub realtime_refresh: Duration,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Upcoming departures shown per board row
    pub max_upcoming: usize,
    /// How far ahead timetable departures are listed when no live data
    /// is available
    pub horizon: chrono::Duration,
    /// Agency time zone the timetable is written in
    pub timezone: Tz,
    pub bind: SocketAddr,
    /// When set, each synced timetable is also written to this SQLite file
    pub db_path: Option<PathBuf>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            schedule: ScheduleLocation::Url(DEFAULT_SCHEDULE_URL.to_string()),
            feed_urls: DEFAULT_FEED_URLS.iter().map(|s| s.to_string()).collect(),
            feed_dir: None,
            api_key: None,
            schedule_refresh: Duration::from_secs(60 * 60),
            realtime_refresh: Duration::from_secs(10),
            timeout_secs: 30,
            max_upcoming: DEFAULT_MAX_UPCOMING,
            horizon: DEFAULT_HORIZON,
            timezone: chrono_tz::America::New_York,
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            db_path: None,
        }
    }
}

impl BoardConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read overrides through `lookup`. Unset or empty variables keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("TRANSIT_SCHEDULE_URL") {
            config.schedule = ScheduleLocation::Url(url);
        }
        if let Some(path) = get("TRANSIT_SCHEDULE_PATH") {
            config.schedule = ScheduleLocation::Path(PathBuf::from(path));
        }
        if let Some(urls) = get("TRANSIT_FEED_URLS") {
            config.feed_urls = urls
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        config.feed_dir = get("TRANSIT_FEED_DIR").map(PathBuf::from);
        config.api_key = get("TRANSIT_API_KEY");

        if let Some(v) = get("TRANSIT_SCHEDULE_REFRESH_SECS") {
            config.schedule_refresh =
                Duration::from_secs(positive("TRANSIT_SCHEDULE_REFRESH_SECS", &v)?);
        }
        if let Some(v) = get("TRANSIT_REALTIME_REFRESH_SECS") {
            config.realtime_refresh =
                Duration::from_secs(positive("TRANSIT_REALTIME_REFRESH_SECS", &v)?);
        }
        if let Some(v) = get("TRANSIT_TIMEOUT_SECS") {
            config.timeout_secs = positive("TRANSIT_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("TRANSIT_MAX_UPCOMING") {
            config.max_upcoming = positive("TRANSIT_MAX_UPCOMING", &v)?;
        }
        if let Some(v) = get("TRANSIT_HORIZON_MINS") {
            config.horizon = horizon("TRANSIT_HORIZON_MINS", &v)?;
        }
        if let Some(v) = get("TRANSIT_TIMEZONE") {
            config.timezone = parse("TRANSIT_TIMEZONE", &v)?;
        }
        if let Some(v) = get("TRANSIT_BIND") {
            config.bind = parse("TRANSIT_BIND", &v)?;
        }
        config.db_path = get("TRANSIT_DB_PATH").map(PathBuf::from);

        Ok(config)
    }

    pub fn with_schedule(mut self, location: ScheduleLocation) -> Self {
        self.schedule = location;
        self
    }

    pub fn with_feed_urls(mut self, urls: Vec<String>) -> Self {
        self.feed_urls = urls;
        self
    }

    pub fn with_feed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.feed_dir = Some(dir.into());
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_max_upcoming(mut self, n: usize) -> Self {
        self.max_upcoming = n;
        self
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.timezone = tz;
        self
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    pub fn schedule_client_config(&self) -> ScheduleClientConfig {
        let mut config =
            ScheduleClientConfig::new(self.schedule.clone()).with_timeout(self.timeout_secs);
        if let Some(key) = &self.api_key {
            config = config.with_api_key(key.clone());
        }
        config
    }

    /// The configured feed sources, in aggregation order.
    pub fn feed_endpoints(&self) -> Result<Vec<FeedEndpoint>, FeedError> {
        if let Some(dir) = &self.feed_dir {
            return Ok(FileFeedSource::from_dir(dir)?
                .into_iter()
                .map(FeedEndpoint::File)
                .collect());
        }

        self.feed_urls
            .iter()
            .map(|url| {
                let mut config = FeedClientConfig::new(url.clone()).with_timeout(self.timeout_secs);
                if let Some(key) = &self.api_key {
                    config = config.with_api_key(key.clone());
                }
                FeedEndpoint::http(config)
            })
            .collect()
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn positive<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialOrd,
    T::Err: std::fmt::Display,
{
    let parsed: T = parse(var, value)?;
    if parsed <= T::default() {
        return Err(ConfigError {
            var,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(parsed)
}

fn horizon(var: &'static str, value: &str) -> Result<chrono::Duration, ConfigError> {
    let minutes: i64 = positive(var, value)?;
    if minutes > MAX_HORIZON_MINS {
        return Err(ConfigError {
            var,
            value: value.to_string(),
            reason: format!("must be at most {MAX_HORIZON_MINS} minutes"),
        });
    }
    chrono::Duration::try_minutes(minutes).ok_or_else(|| ConfigError {
        var,
        value: value.to_string(),
        reason: "out of range".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::FeedSource;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn defaults() {
        let config = BoardConfig::default();
        assert_eq!(config.feed_urls.len(), 8);
        assert_eq!(config.schedule_refresh, Duration::from_secs(3600));
        assert_eq!(config.realtime_refresh, Duration::from_secs(10));
        assert_eq!(config.max_upcoming, 3);
        assert_eq!(config.horizon, chrono::Duration::hours(12));
        assert_eq!(config.timezone, chrono_tz::America::New_York);
        assert_eq!(config.bind.to_string(), "127.0.0.1:3000");
        assert!(config.db_path.is_none());
    }

    #[test]
    fn empty_environment_keeps_defaults() {
        let config = BoardConfig::from_lookup(lookup(&[("TRANSIT_API_KEY", "")])).unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.feed_urls.len(), 8);
    }

    #[test]
    fn overrides_from_environment() {
        let config = BoardConfig::from_lookup(lookup(&[
            ("TRANSIT_SCHEDULE_PATH", "/data/gtfs.zip"),
            ("TRANSIT_FEED_URLS", "http://a/feed, http://b/feed,"),
            ("TRANSIT_API_KEY", "secret"),
            ("TRANSIT_REALTIME_REFRESH_SECS", "30"),
            ("TRANSIT_MAX_UPCOMING", "2"),
            ("TRANSIT_HORIZON_MINS", "90"),
            ("TRANSIT_TIMEZONE", "Europe/London"),
            ("TRANSIT_BIND", "0.0.0.0:8080"),
            ("TRANSIT_DB_PATH", "/data/gtfs.db"),
        ]))
        .unwrap();

        assert_eq!(
            config.schedule,
            ScheduleLocation::Path(PathBuf::from("/data/gtfs.zip"))
        );
        assert_eq!(config.feed_urls, vec!["http://a/feed", "http://b/feed"]);
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.realtime_refresh, Duration::from_secs(30));
        assert_eq!(config.max_upcoming, 2);
        assert_eq!(config.horizon, chrono::Duration::minutes(90));
        assert_eq!(config.timezone, chrono_tz::Europe::London);
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.db_path, Some(PathBuf::from("/data/gtfs.db")));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = BoardConfig::from_lookup(lookup(&[("TRANSIT_TIMEZONE", "Mars/Olympus")]))
            .unwrap_err();
        assert_eq!(err.var, "TRANSIT_TIMEZONE");

        let err = BoardConfig::from_lookup(lookup(&[("TRANSIT_REALTIME_REFRESH_SECS", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("greater than zero"));

        let err =
            BoardConfig::from_lookup(lookup(&[("TRANSIT_MAX_UPCOMING", "lots")])).unwrap_err();
        assert_eq!(err.var, "TRANSIT_MAX_UPCOMING");
    }

    #[test]
    fn horizon_is_capped() {
        let config =
            BoardConfig::from_lookup(lookup(&[("TRANSIT_HORIZON_MINS", "10080")])).unwrap();
        assert_eq!(config.horizon, chrono::Duration::days(7));

        let too_far = [
            "10081",
            "1000000000000",
            "200000000000000",
            "99999999999999999999",
            "-5",
        ];
        for value in too_far {
            let err = BoardConfig::from_lookup(lookup(&[("TRANSIT_HORIZON_MINS", value)]))
                .unwrap_err();
            assert_eq!(err.var, "TRANSIT_HORIZON_MINS");
        }
    }

    #[test]
    fn http_feed_endpoints_in_order() {
        let endpoints = BoardConfig::default().feed_endpoints().unwrap();
        let names: Vec<&str> = endpoints.iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec![
                "gtfs-ace", "gtfs-bdfm", "gtfs-g", "gtfs-jz", "gtfs-nqrw", "gtfs-l", "gtfs", "gtfs-si"
            ]
        );
    }

    #[test]
    fn file_feed_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ace.pb"), b"").unwrap();

        let endpoints = BoardConfig::default()
            .with_feed_dir(dir.path())
            .feed_endpoints()
            .unwrap();
        assert_eq!(endpoints.len(), 1);
        assert!(matches!(endpoints[0], FeedEndpoint::File(_)));
    }

    #[test]
    fn schedule_client_config_carries_key() {
        let config = BoardConfig::default().with_api_key("k").schedule_client_config();
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.timeout_secs, 30);
    }
}
