//! Station board assembly.
//!
//! A board lists a station's routes in the feed's curated order, each with
//! one row per boarding platform and destination.

use serde::Serialize;

use crate::departures::{Clock, resolve_departures};
use crate::domain::{Departure, DepartureSource, StationCode, direction_of};
use crate::format::{Upcoming, format_upcoming};
use crate::realtime::FeedSnapshot;
use crate::schedule::{Route, Schedule};

/// Departures for one station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationBoard {
    pub station_id: String,
    pub station_name: String,
    pub source: DepartureSource,
    pub routes: Vec<RouteBoard>,
    /// Whether any row has an upcoming departure
    pub has_any: bool,
}

/// One route's section of a board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteBoard {
    pub route_id: String,
    pub short_name: String,
    pub long_name: String,
    pub color: String,
    pub text_color: String,
    pub rows: Vec<BoardRow>,
}

/// Upcoming departures from one platform towards one destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardRow {
    pub stop_id: String,
    /// Platform direction letter (`N`/`S`)
    pub direction: Option<char>,
    pub final_stop_id: String,
    pub destination: String,
    pub upcoming: Upcoming,
    pub summary: String,
}

impl StationBoard {
    /// Build the board for `code`, or `None` if the schedule has no such
    /// station.
    pub fn build(
        schedule: &Schedule,
        code: &StationCode,
        realtime: Option<&[FeedSnapshot]>,
        clock: &Clock,
        max_upcoming: usize,
    ) -> Option<Self> {
        let station = schedule.station(code)?;
        let platform_ids = schedule.platform_ids(code);
        let departures = resolve_departures(&platform_ids, realtime, schedule, clock);
        let now = clock.now.timestamp();

        let mut routes: Vec<RouteBoard> = station
            .routes
            .iter()
            .map(RouteBoard::from_route)
            .collect();

        for departure in departures {
            let upcoming = format_upcoming(&departure.times, now, max_upcoming);
            if !upcoming.has_any() {
                continue;
            }

            let index = match routes.iter().position(|r| r.route_id == departure.route_id) {
                Some(index) => index,
                None => {
                    let section = match schedule.route(&departure.route_id) {
                        Some(route) => RouteBoard::from_route(route),
                        None => RouteBoard::bare(&departure.route_id),
                    };
                    routes.push(section);
                    routes.len() - 1
                }
            };
            routes[index].rows.push(BoardRow::new(departure, upcoming));
        }

        let has_any = routes.iter().any(|r| !r.rows.is_empty());

        Some(Self {
            station_id: station.id().to_string(),
            station_name: station.name().to_string(),
            source: match realtime {
                Some(_) => DepartureSource::Realtime,
                None => DepartureSource::Scheduled,
            },
            routes,
            has_any,
        })
    }
}

impl RouteBoard {
    fn from_route(route: &Route) -> Self {
        Self {
            route_id: route.route_id.clone(),
            short_name: route.route_short_name.clone(),
            long_name: route.route_long_name.clone(),
            color: route.route_color.clone(),
            text_color: route.route_text_color.clone(),
            rows: Vec::new(),
        }
    }

    /// A section for a route the timetable doesn't know.
    fn bare(route_id: &str) -> Self {
        Self {
            route_id: route_id.to_string(),
            short_name: route_id.to_string(),
            long_name: String::new(),
            color: String::new(),
            text_color: String::new(),
            rows: Vec::new(),
        }
    }
}

impl BoardRow {
    fn new(departure: Departure, upcoming: Upcoming) -> Self {
        let summary = upcoming.summary();
        Self {
            direction: direction_of(&departure.stop_id),
            stop_id: departure.stop_id,
            final_stop_id: departure.final_stop_id,
            destination: departure.final_stop_name,
            upcoming,
            summary,
        }
    }
}
