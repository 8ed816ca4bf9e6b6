//! Resolved departure groups.

use serde::Serialize;
use std::fmt;

/// Where a departure's times came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepartureSource {
    /// Predicted times from a live feed.
    Realtime,
    /// Timetable times, used while no live feed is available.
    Scheduled,
}

impl fmt::Display for DepartureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepartureSource::Realtime => f.write_str("realtime"),
            DepartureSource::Scheduled => f.write_str("scheduled"),
        }
    }
}

/// Upcoming departures from one boarding stop on one route towards one
/// final stop.
///
/// Recomputed on every resolution; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Departure {
    pub route_id: String,

    /// Boarding stop (a platform id such as `A46N`).
    pub stop_id: String,

    /// Last stop of the trips in this group.
    pub final_stop_id: String,

    /// Name of the final stop; empty when the stop is unknown.
    pub final_stop_name: String,

    /// Departure instants in epoch seconds, ascending. Several trips may
    /// share a destination, so duplicates are possible.
    pub times: Vec<i64>,

    pub source: DepartureSource,
}
