//! Application state for the web layer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::config::BoardConfig;
use crate::query::QueryState;
use crate::realtime::FeedSnapshot;
use crate::schedule::Schedule;

/// Shared application state.
///
/// Handlers only ever read the latest published query states; the queries
/// themselves run elsewhere.
#[derive(Clone)]
pub struct AppState {
    /// Latest static timetable
    pub schedule: watch::Receiver<QueryState<Schedule>>,

    /// Latest realtime snapshots, one per feed source
    pub realtime: watch::Receiver<QueryState<Vec<FeedSnapshot>>>,

    pub config: Arc<BoardConfig>,

    /// Wall clock, replaceable in tests
    pub now: fn() -> DateTime<Utc>,
}

impl AppState {
    pub fn new(
        schedule: watch::Receiver<QueryState<Schedule>>,
        realtime: watch::Receiver<QueryState<Vec<FeedSnapshot>>>,
        config: BoardConfig,
    ) -> Self {
        Self {
            schedule,
            realtime,
            config: Arc::new(config),
            now: Utc::now,
        }
    }

    pub fn with_clock(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}
