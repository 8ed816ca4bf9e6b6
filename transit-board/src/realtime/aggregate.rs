//! Concurrent fetching across feed sources.
//!
//! Every source is asked at once and the aggregator waits for all of them.
//! Results come back in the order the sources were declared, not the
//! order they finished. One failing source fails the whole round.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use super::client::{FeedClientConfig, HttpFeedSource};
use super::error::{FeedError, FetchFailure};
use super::mock::FileFeedSource;
use super::types::FeedSnapshot;

/// Something that produces a feed snapshot on demand.
pub trait FeedSource {
    /// Short name used in logs and error reports.
    fn name(&self) -> &str;

    /// Fetch and decode the current payload.
    fn fetch(&self) -> impl Future<Output = Result<FeedSnapshot, FeedError>> + Send;
}

/// A configured feed source.
#[derive(Debug, Clone)]
pub enum FeedEndpoint {
    Http(HttpFeedSource),
    File(FileFeedSource),
}

impl FeedEndpoint {
    pub fn http(config: FeedClientConfig) -> Result<Self, FeedError> {
        Ok(FeedEndpoint::Http(HttpFeedSource::new(config)?))
    }

    pub fn file(path: impl Into<std::path::PathBuf>) -> Self {
        FeedEndpoint::File(FileFeedSource::new(path))
    }
}

impl FeedSource for FeedEndpoint {
    fn name(&self) -> &str {
        match self {
            FeedEndpoint::Http(source) => source.name(),
            FeedEndpoint::File(source) => source.name(),
        }
    }

    async fn fetch(&self) -> Result<FeedSnapshot, FeedError> {
        match self {
            FeedEndpoint::Http(source) => source.fetch().await,
            FeedEndpoint::File(source) => source.fetch().await,
        }
    }
}

/// Default per-source timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fans a fetch out over several sources.
#[derive(Debug, Clone)]
pub struct FeedAggregator<S = FeedEndpoint> {
    sources: Vec<S>,
    timeout: Duration,
}

impl<S: FeedSource> FeedAggregator<S> {
    pub fn new(sources: Vec<S>) -> Self {
        Self {
            sources,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Bound each source's fetch. A source that overruns fails the round.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sources(&self) -> &[S] {
        &self.sources
    }

    /// Fetch every source concurrently.
    ///
    /// On success the snapshots are in source order. On failure the error
    /// names the first failing source in declaration order and the other
    /// results are dropped.
    pub async fn fetch_all(&self) -> Result<Vec<FeedSnapshot>, FetchFailure> {
        let timeout = self.timeout;
        let fetches = self.sources.iter().map(|source| async move {
            match tokio::time::timeout(timeout, source.fetch()).await {
                Ok(result) => result,
                Err(_) => Err(FeedError::Timeout(timeout)),
            }
        });

        let results = join_all(fetches).await;

        let mut snapshots = Vec::with_capacity(results.len());
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(error) => {
                    let name = self.sources[index].name().to_string();
                    warn!(source = %name, error = %error, "Feed fetch failed");
                    return Err(FetchFailure { index, name, error });
                }
            }
        }

        debug!(
            sources = snapshots.len(),
            trip_updates = snapshots.iter().map(|s| s.trip_updates.len()).sum::<usize>(),
            "Fetched all feeds"
        );
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Resolves after a delay with a canned result.
    struct MockSource {
        name: String,
        delay: Duration,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl MockSource {
        fn ok(name: &str, delay_ms: u64) -> Self {
            Self {
                name: name.to_string(),
                delay: Duration::from_millis(delay_ms),
                fail: false,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing(name: &str, delay_ms: u64) -> Self {
            Self {
                fail: true,
                ..Self::ok(name, delay_ms)
            }
        }
    }

    impl FeedSource for MockSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn fetch(&self) -> Result<FeedSnapshot, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(FeedError::Api {
                    status: 503,
                    message: "unavailable".into(),
                });
            }
            Ok(FeedSnapshot {
                source: self.name.clone(),
                ..Default::default()
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn preserves_declaration_order() {
        // The second source finishes first
        let aggregator = FeedAggregator::new(vec![
            MockSource::ok("slow", 500),
            MockSource::ok("fast", 10),
        ]);

        let snapshots = aggregator.fetch_all().await.unwrap();
        let names: Vec<&str> = snapshots.iter().map(|s| s.source.as_str()).collect();
        assert_eq!(names, vec!["slow", "fast"]);
    }

    #[tokio::test(start_paused = true)]
    async fn any_failure_fails_the_round() {
        let aggregator = FeedAggregator::new(vec![
            MockSource::ok("ace", 10),
            MockSource::failing("l", 20),
        ]);

        let failure = aggregator.fetch_all().await.unwrap_err();
        assert_eq!(failure.index, 1);
        assert_eq!(failure.name, "l");
    }

    #[tokio::test(start_paused = true)]
    async fn first_failure_in_declaration_order_is_reported() {
        // "b" fails sooner, but "a" is declared first
        let aggregator = FeedAggregator::new(vec![
            MockSource::failing("a", 100),
            MockSource::failing("b", 1),
        ]);

        let failure = aggregator.fetch_all().await.unwrap_err();
        assert_eq!(failure.name, "a");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_times_out() {
        let aggregator = FeedAggregator::new(vec![
            MockSource::ok("ok", 10),
            MockSource::ok("stuck", 60_000),
        ])
        .with_timeout(Duration::from_secs(5));

        let failure = aggregator.fetch_all().await.unwrap_err();
        assert_eq!(failure.name, "stuck");
        assert!(matches!(failure.error, FeedError::Timeout(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn sources_run_concurrently() {
        let start = tokio::time::Instant::now();
        let aggregator = FeedAggregator::new(vec![
            MockSource::ok("a", 1_000),
            MockSource::ok("b", 1_000),
            MockSource::ok("c", 1_000),
        ]);

        aggregator.fetch_all().await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(1_500));
    }

    #[tokio::test(start_paused = true)]
    async fn every_source_is_asked_each_round() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut a = MockSource::ok("a", 1);
        a.calls = calls.clone();
        let mut b = MockSource::failing("b", 1);
        b.calls = calls.clone();

        let aggregator = FeedAggregator::new(vec![a, b]);
        let _ = aggregator.fetch_all().await;
        let _ = aggregator.fetch_all().await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn no_sources_is_empty_success() {
        let aggregator: FeedAggregator<MockSource> = FeedAggregator::new(Vec::new());
        assert!(aggregator.fetch_all().await.unwrap().is_empty());
    }
}
