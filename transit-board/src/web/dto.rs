//! Data transfer objects for web responses.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::board::StationBoard;
use crate::query::{FetchStatus, QueryState, QueryStatus};
use crate::schedule::{Route, Station};

/// Observable state of one background query.
#[derive(Debug, Serialize)]
pub struct QueryStatusResult {
    pub status: QueryStatus,
    pub fetch_status: FetchStatus,
    /// When the current data was fetched
    pub updated_at: Option<DateTime<Utc>>,
    /// Last failure, while data may be stale
    pub error: Option<String>,
}

impl<T> From<&QueryState<T>> for QueryStatusResult {
    fn from(state: &QueryState<T>) -> Self {
        Self {
            status: state.status,
            fetch_status: state.fetch_status,
            updated_at: state.updated_at,
            error: state.error.clone(),
        }
    }
}

/// Response for `/status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub schedule: QueryStatusResult,
    pub realtime: QueryStatusResult,
}

/// A route in station listings.
#[derive(Debug, Serialize)]
pub struct RouteResult {
    pub id: String,
    pub short_name: String,
    pub long_name: String,
    pub color: String,
    pub text_color: String,
}

impl From<&Route> for RouteResult {
    fn from(route: &Route) -> Self {
        Self {
            id: route.route_id.clone(),
            short_name: route.route_short_name.clone(),
            long_name: route.route_long_name.clone(),
            color: route.route_color.clone(),
            text_color: route.route_text_color.clone(),
        }
    }
}

/// A station in station listings.
#[derive(Debug, Serialize)]
pub struct StationResult {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub routes: Vec<RouteResult>,
}

impl From<&Station> for StationResult {
    fn from(station: &Station) -> Self {
        Self {
            id: station.id().to_string(),
            name: station.name().to_string(),
            lat: station.stop.stop_lat,
            lon: station.stop.stop_lon,
            routes: station.routes.iter().map(RouteResult::from).collect(),
        }
    }
}

/// Response for `/stations`.
#[derive(Debug, Serialize)]
pub struct StationsResponse {
    pub stations: Vec<StationResult>,
}

/// Response for `/stations/:id/departures`.
#[derive(Debug, Serialize)]
pub struct BoardResponse {
    #[serde(flatten)]
    pub board: StationBoard,
    pub schedule: QueryStatusResult,
    pub realtime: QueryStatusResult,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}
