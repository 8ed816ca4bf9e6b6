//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::board::StationBoard;
use crate::departures::Clock;
use crate::domain::StationCode;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/stations", get(list_stations))
        .route("/stations/:id/departures", get(station_departures))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// State of the schedule and realtime queries.
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let schedule = state.schedule.borrow().clone();
    let realtime = state.realtime.borrow().clone();

    Json(StatusResponse {
        schedule: QueryStatusResult::from(&schedule),
        realtime: QueryStatusResult::from(&realtime),
    })
}

/// All stations with the routes serving them.
async fn list_stations(State(state): State<AppState>) -> Result<Json<StationsResponse>, AppError> {
    let schedule = state.schedule.borrow().clone();
    let Some(schedule) = schedule.data else {
        return Err(AppError::Loading);
    };

    let stations = schedule
        .stations()
        .iter()
        .map(StationResult::from)
        .collect();

    Ok(Json(StationsResponse { stations }))
}

/// Departure board for one station.
async fn station_departures(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BoardResponse>, AppError> {
    let code = StationCode::parse_normalized(&id).map_err(|_| AppError::BadRequest {
        message: format!("Invalid station id: {id}"),
    })?;

    let schedule_state = state.schedule.borrow().clone();
    let realtime_state = state.realtime.borrow().clone();

    let Some(schedule) = schedule_state.data.as_deref() else {
        return Err(AppError::Loading);
    };

    let config = &state.config;
    let clock = Clock::new((state.now)(), config.timezone).with_horizon(config.horizon);
    let realtime = realtime_state.data.as_deref().map(Vec::as_slice);

    let board = StationBoard::build(schedule, &code, realtime, &clock, config.max_upcoming)
        .ok_or_else(|| AppError::NotFound {
            message: format!("Unknown station: {code}"),
        })?;

    Ok(Json(BoardResponse {
        board,
        schedule: QueryStatusResult::from(&schedule_state),
        realtime: QueryStatusResult::from(&realtime_state),
    }))
}

// Error handling

#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    /// The timetable has not been fetched yet
    Loading,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Loading => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Schedule is still loading".to_string(),
            ),
        };

        if status.is_server_error() {
            error!(%status, %message, "Request failed");
        } else {
            warn!(%status, %message, "Request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
