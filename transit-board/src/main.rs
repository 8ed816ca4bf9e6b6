use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use transit_board::config::BoardConfig;
use transit_board::query::{Query, QueryOptions};
use transit_board::realtime::{FeedAggregator, FeedSource};
use transit_board::schedule::{Schedule, ScheduleClient, ScheduleError, ScheduleTables};
use transit_board::store::ScheduleStore;
use transit_board::web::{AppState, create_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BoardConfig::from_env()?;
    if config.api_key.is_none() {
        warn!("TRANSIT_API_KEY not set; feeds that require a key will fail");
    }

    // Static timetable, refreshed hourly by default
    let schedule_client = ScheduleClient::new(config.schedule_client_config())?;
    info!(source = %schedule_client.location(), "Schedule source");
    let db_path = config.db_path.clone();
    let synced = Arc::new(AtomicBool::new(false));
    let schedule_query = Query::spawn(
        QueryOptions::new("schedule", config.schedule_refresh),
        move || {
            let client = schedule_client.clone();
            let db_path = db_path.clone();
            let synced = synced.clone();
            async move {
                let warm_start = !synced.load(Ordering::Relaxed);
                let schedule = sync_schedule(&client, db_path, warm_start).await?;
                synced.store(true, Ordering::Relaxed);
                Ok::<_, ScheduleError>(schedule)
            }
        },
    );

    // Realtime feeds, refreshed every few seconds
    let aggregator = Arc::new(
        FeedAggregator::new(config.feed_endpoints()?)
            .with_timeout(Duration::from_secs(config.timeout_secs)),
    );
    let names: Vec<&str> = aggregator.sources().iter().map(|s| s.name()).collect();
    info!(feeds = ?names, "Realtime sources");
    let realtime_query = Query::spawn(
        QueryOptions::new("realtime", config.realtime_refresh),
        move || {
            let aggregator = aggregator.clone();
            async move { aggregator.fetch_all().await }
        },
    );

    let bind = config.bind;
    let state = AppState::new(
        schedule_query.subscribe(),
        realtime_query.subscribe(),
        config,
    );
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Departure board listening on http://{bind}");
    info!("API Endpoints:");
    info!("  GET  /health                    - Health check");
    info!("  GET  /status                    - Sync status");
    info!("  GET  /stations                  - Stations and their routes");
    info!("  GET  /stations/:id/departures   - Departure board");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("Shutting down");
    schedule_query.shutdown().await;
    realtime_query.shutdown().await;
    Ok(())
}

/// Fetch the timetable, persisting it first when a database is configured.
///
/// A failed write is logged; the freshly fetched timetable is served either
/// way. With `warm_start`, a failed fetch falls back to the stored copy.
async fn sync_schedule(
    client: &ScheduleClient,
    db_path: Option<PathBuf>,
    warm_start: bool,
) -> Result<Schedule, ScheduleError> {
    let tables = match client.fetch_tables().await {
        Ok(tables) => tables,
        Err(e) => {
            return match db_path.filter(|_| warm_start) {
                Some(path) => restore(path, e).await,
                None => Err(e),
            };
        }
    };

    let tables = match db_path {
        Some(path) => tokio::task::spawn_blocking(move || persist(&path, tables))
            .await
            .map_err(|e| ScheduleError::Task(e.to_string()))?,
        None => tables,
    };

    Ok(Schedule::new(tables))
}

/// Serve the stored timetable in place of a failed first fetch.
async fn restore(path: PathBuf, fetch_error: ScheduleError) -> Result<Schedule, ScheduleError> {
    warn!(
        error = %fetch_error,
        path = %path.display(),
        "Schedule fetch failed, trying stored copy"
    );
    let restored = tokio::task::spawn_blocking(move || ScheduleStore::restore(&path))
        .await
        .map_err(|e| ScheduleError::Task(e.to_string()))?;

    match restored {
        Ok(Some(tables)) => {
            info!(stops = tables.stops.len(), "Serving stored schedule");
            Ok(Schedule::new(tables))
        }
        Ok(None) => Err(fetch_error),
        Err(e) => {
            warn!(error = %e, "Failed to read stored schedule");
            Err(fetch_error)
        }
    }
}

fn persist(path: &Path, tables: ScheduleTables) -> ScheduleTables {
    let result = ScheduleStore::open(path).and_then(|mut store| store.replace(&tables));
    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "Failed to persist schedule");
    }
    tables
}
