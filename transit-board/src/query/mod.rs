//! Background polling with observable state.
//!
//! A [`Query`] runs a fetch function once on start and then on a fixed
//! interval, publishing a small state machine through a `watch` channel:
//!
//! - `status` says what the latest finished fetch did (`Pending` until one
//!   has finished at all)
//! - `fetch_status` says whether a fetch is in flight right now
//!
//! A failed fetch keeps the last good data, so readers can show stale data
//! alongside an error instead of nothing.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Outcome of the most recent finished fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Pending,
    Error,
    Success,
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryStatus::Pending => f.write_str("Pending"),
            QueryStatus::Error => f.write_str("Error"),
            QueryStatus::Success => f.write_str("Success"),
        }
    }
}

/// Whether a fetch is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Fetching,
    Idle,
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStatus::Fetching => f.write_str("Fetching"),
            FetchStatus::Idle => f.write_str("Idle"),
        }
    }
}

/// What subscribers see.
#[derive(Debug)]
pub struct QueryState<T> {
    /// Data from the last successful fetch
    pub data: Option<Arc<T>>,
    /// When `data` was fetched
    pub updated_at: Option<DateTime<Utc>>,
    pub status: QueryStatus,
    pub fetch_status: FetchStatus,
    /// Message of the last failure, cleared by the next success
    pub error: Option<String>,
}

impl<T> QueryState<T> {
    pub fn is_pending(&self) -> bool {
        self.status == QueryStatus::Pending
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            updated_at: None,
            status: QueryStatus::Pending,
            fetch_status: FetchStatus::Idle,
            error: None,
        }
    }
}

// Manual impl: cloning shares the data, so `T` need not be `Clone`.
impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            updated_at: self.updated_at,
            status: self.status,
            fetch_status: self.fetch_status,
            error: self.error.clone(),
        }
    }
}

/// Configuration for a query.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Used in log lines
    pub name: String,
    pub refetch_interval: Duration,
}

impl QueryOptions {
    pub fn new(name: impl Into<String>, refetch_interval: Duration) -> Self {
        Self {
            name: name.into(),
            refetch_interval,
        }
    }
}

/// Handle to a running query.
///
/// Dropping the handle stops the query just like [`Query::stop`].
#[derive(Debug)]
pub struct Query<T> {
    state: watch::Receiver<QueryState<T>>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl<T: Send + Sync + 'static> Query<T> {
    /// Start polling `fetch` in the background.
    ///
    /// The first fetch starts immediately. Ticks missed while a slow fetch
    /// was running are skipped rather than bunched up.
    pub fn spawn<F, Fut, E>(options: QueryOptions, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let (state_tx, state_rx) = watch::channel(QueryState::default());
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let QueryOptions {
                name,
                refetch_interval,
            } = options;
            let mut interval = tokio::time::interval(refetch_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    // Ok means stop() was called, Err that the handle was dropped
                    _ = stop_rx.changed() => break,
                    _ = interval.tick() => {}
                }

                state_tx.send_modify(|state| state.fetch_status = FetchStatus::Fetching);
                debug!(query = %name, "Fetching");

                let result = fetch().await;

                let stopped = match stop_rx.has_changed() {
                    Ok(_) => *stop_rx.borrow(),
                    Err(_) => true,
                };
                if stopped {
                    state_tx.send_modify(|state| state.fetch_status = FetchStatus::Idle);
                    break;
                }

                match result {
                    Ok(data) => {
                        state_tx.send_modify(|state| {
                            state.data = Some(Arc::new(data));
                            state.updated_at = Some(Utc::now());
                            state.status = QueryStatus::Success;
                            state.fetch_status = FetchStatus::Idle;
                            state.error = None;
                        });
                        info!(query = %name, "Fetch succeeded");
                    }
                    Err(e) => {
                        let message = e.to_string();
                        warn!(query = %name, error = %message, "Fetch failed");
                        state_tx.send_modify(|state| {
                            state.status = QueryStatus::Error;
                            state.fetch_status = FetchStatus::Idle;
                            state.error = Some(message);
                        });
                    }
                }
            }

            debug!(query = %name, "Query stopped");
        });

        Self {
            state: state_rx,
            stop: stop_tx,
            task,
        }
    }
}

impl<T> Query<T> {
    /// A receiver that sees every published state.
    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.state.clone()
    }

    /// The latest published state.
    pub fn snapshot(&self) -> QueryState<T> {
        self.state.borrow().clone()
    }

    /// Stop polling. No further fetches start; a fetch already in flight
    /// runs to completion but its result is discarded.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    /// Stop and wait for the background task to exit.
    pub async fn shutdown(self) {
        self.stop();
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
