//! Lookup structures over one schedule snapshot.
//!
//! Each index is built on first use and kept for the lifetime of the
//! snapshot. A new sync produces a new `Schedule` rather than updating
//! this one.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDate;

use super::archive::ScheduleTables;
use super::calendar::{ActiveServices, active_services};
use super::records::{LocationType, Route, Stop, StopTime, Trip};
use crate::domain::{StationCode, station_code_of};

/// A station and the routes that call at any of its platforms.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub stop: Stop,
    /// In routes-table order.
    pub routes: Vec<Route>,
}

impl Station {
    pub fn id(&self) -> &str {
        &self.stop.stop_id
    }

    pub fn name(&self) -> &str {
        &self.stop.stop_name
    }
}

/// Indexed static timetable.
pub struct Schedule {
    tables: ScheduleTables,
    stop_names: OnceLock<HashMap<String, String>>,
    stations: OnceLock<Vec<Station>>,
    trips_by_id: OnceLock<HashMap<String, usize>>,
    trips_by_service_route: OnceLock<HashMap<String, HashMap<String, Vec<usize>>>>,
    stop_times_by_trip: OnceLock<HashMap<String, Vec<usize>>>,
    stop_times_by_stop: OnceLock<HashMap<String, Vec<usize>>>,
}

impl Schedule {
    pub fn new(tables: ScheduleTables) -> Self {
        Self {
            tables,
            stop_names: OnceLock::new(),
            stations: OnceLock::new(),
            trips_by_id: OnceLock::new(),
            trips_by_service_route: OnceLock::new(),
            stop_times_by_trip: OnceLock::new(),
            stop_times_by_stop: OnceLock::new(),
        }
    }

    pub fn tables(&self) -> &ScheduleTables {
        &self.tables
    }

    pub fn stop_names(&self) -> &HashMap<String, String> {
        self.stop_names.get_or_init(|| {
            self.tables
                .stops
                .iter()
                .map(|s| (s.stop_id.clone(), s.stop_name.clone()))
                .collect()
        })
    }

    pub fn stop_name(&self, stop_id: &str) -> Option<&str> {
        self.stop_names().get(stop_id).map(String::as_str)
    }

    /// All stations, in stops-table order.
    pub fn stations(&self) -> &[Station] {
        self.stations.get_or_init(|| self.build_stations())
    }

    pub fn station(&self, code: &StationCode) -> Option<&Station> {
        self.stations().iter().find(|s| s.id() == code.as_str())
    }

    /// Boarding stop ids for a station.
    ///
    /// These are the platform stops sharing the station's code. When the
    /// stops table lists none, the conventional `<code>N` and `<code>S` are
    /// assumed.
    pub fn platform_ids(&self, code: &StationCode) -> Vec<String> {
        let ids: Vec<String> = self
            .tables
            .stops
            .iter()
            .filter(|s| s.location_type == LocationType::Platform)
            .filter(|s| s.stop_id != code.as_str())
            .filter(|s| station_code_of(&s.stop_id) == Some(code.as_str()))
            .map(|s| s.stop_id.clone())
            .collect();

        if ids.is_empty() {
            code.default_platform_ids().into()
        } else {
            ids
        }
    }

    pub fn route(&self, route_id: &str) -> Option<&Route> {
        self.tables.routes.iter().find(|r| r.route_id == route_id)
    }

    pub fn trip(&self, trip_id: &str) -> Option<&Trip> {
        self.trips_by_id()
            .get(trip_id)
            .map(|&i| &self.tables.trips[i])
    }

    /// Trips of `route_id` that belong to `service_id`, in trips-table
    /// order.
    pub fn trips_for(&self, service_id: &str, route_id: &str) -> Vec<&Trip> {
        self.trips_by_service_route()
            .get(service_id)
            .and_then(|routes| routes.get(route_id))
            .map(|indices| indices.iter().map(|&i| &self.tables.trips[i]).collect())
            .unwrap_or_default()
    }

    /// A trip's stop times, ascending by stop sequence. The last one is the
    /// trip's final stop.
    pub fn ordered_stop_times(&self, trip_id: &str) -> Vec<&StopTime> {
        self.stop_times_by_trip()
            .get(trip_id)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&i| &self.tables.stop_times[i])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every stop time at `stop_id`, in file order.
    pub fn stop_times_at(&self, stop_id: &str) -> Vec<&StopTime> {
        self.stop_times_by_stop()
            .get(stop_id)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&i| &self.tables.stop_times[i])
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn active_services(&self, date: NaiveDate) -> ActiveServices {
        active_services(date, &self.tables.calendars, &self.tables.calendar_dates)
    }

    fn trips_by_id(&self) -> &HashMap<String, usize> {
        self.trips_by_id.get_or_init(|| {
            self.tables
                .trips
                .iter()
                .enumerate()
                .map(|(i, t)| (t.trip_id.clone(), i))
                .collect()
        })
    }

    fn trips_by_service_route(&self) -> &HashMap<String, HashMap<String, Vec<usize>>> {
        self.trips_by_service_route.get_or_init(|| {
            let mut index: HashMap<String, HashMap<String, Vec<usize>>> = HashMap::new();
            for (i, trip) in self.tables.trips.iter().enumerate() {
                index
                    .entry(trip.service_id.clone())
                    .or_default()
                    .entry(trip.route_id.clone())
                    .or_default()
                    .push(i);
            }
            index
        })
    }

    fn stop_times_by_trip(&self) -> &HashMap<String, Vec<usize>> {
        self.stop_times_by_trip.get_or_init(|| {
            let stop_times = &self.tables.stop_times;
            let mut index: HashMap<String, Vec<usize>> = HashMap::new();
            for (i, st) in stop_times.iter().enumerate() {
                index.entry(st.trip_id.clone()).or_default().push(i);
            }
            for indices in index.values_mut() {
                indices.sort_by_key(|&i| stop_times[i].stop_sequence);
            }
            index
        })
    }

    fn stop_times_by_stop(&self) -> &HashMap<String, Vec<usize>> {
        self.stop_times_by_stop.get_or_init(|| {
            let mut index: HashMap<String, Vec<usize>> = HashMap::new();
            for (i, st) in self.tables.stop_times.iter().enumerate() {
                index.entry(st.stop_id.clone()).or_default().push(i);
            }
            index
        })
    }

    fn build_stations(&self) -> Vec<Station> {
        let mut routes_at: HashMap<&str, HashSet<&str>> = HashMap::new();
        for st in &self.tables.stop_times {
            let (Some(code), Some(trip)) = (station_code_of(&st.stop_id), self.trip(&st.trip_id))
            else {
                continue;
            };
            routes_at
                .entry(code)
                .or_default()
                .insert(trip.route_id.as_str());
        }

        self.tables
            .stops
            .iter()
            .filter(|s| s.location_type == LocationType::Station)
            .map(|stop| {
                let serving = routes_at.get(stop.stop_id.as_str());
                let routes = self
                    .tables
                    .routes
                    .iter()
                    .filter(|r| serving.is_some_and(|set| set.contains(r.route_id.as_str())))
                    .cloned()
                    .collect();
                Station {
                    stop: stop.clone(),
                    routes,
                }
            })
            .collect()
    }
}

impl fmt::Debug for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schedule")
            .field("stops", &self.tables.stops.len())
            .field("routes", &self.tables.routes.len())
            .field("trips", &self.tables.trips.len())
            .field("stop_times", &self.tables.stop_times.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::archive::read_archive;
    use crate::schedule::archive::tests::full_archive;

    fn schedule() -> Schedule {
        Schedule::new(read_archive(&full_archive()).unwrap())
    }

    fn code(s: &str) -> StationCode {
        StationCode::parse(s).unwrap()
    }

    #[test]
    fn stop_names() {
        let schedule = schedule();
        assert_eq!(schedule.stop_name("101S"), Some("Van Cortlandt Park-242 St"));
        assert_eq!(schedule.stop_name("A46"), Some("Utica Av"));
        assert_eq!(schedule.stop_name("XYZ"), None);
    }

    #[test]
    fn stations_list_serving_routes_in_table_order() {
        let schedule = schedule();
        let stations = schedule.stations();
        assert_eq!(stations.len(), 2);

        let utica = schedule.station(&code("A46")).unwrap();
        assert_eq!(utica.name(), "Utica Av");
        let routes: Vec<&str> = utica.routes.iter().map(|r| r.route_id.as_str()).collect();
        assert_eq!(routes, vec!["A"]);

        // Both routes call at 101S; routes.txt lists A before 1
        let vcp = schedule.station(&code("101")).unwrap();
        let routes: Vec<&str> = vcp.routes.iter().map(|r| r.route_id.as_str()).collect();
        assert_eq!(routes, vec!["A", "1"]);
    }

    #[test]
    fn unknown_station() {
        assert!(schedule().station(&code("Z99")).is_none());
    }

    #[test]
    fn platform_ids_from_stops_table() {
        let schedule = schedule();
        assert_eq!(schedule.platform_ids(&code("A46")), vec!["A46N", "A46S"]);
        assert_eq!(schedule.platform_ids(&code("101")), vec!["101S"]);
    }

    #[test]
    fn platform_ids_default_when_none_listed() {
        assert_eq!(schedule().platform_ids(&code("R01")), vec!["R01N", "R01S"]);
    }

    #[test]
    fn trips_by_service_and_route() {
        let schedule = schedule();
        let trips = schedule.trips_for("Weekday", "A");
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].trip_id, "A_T1");

        assert!(schedule.trips_for("Weekday", "Z").is_empty());
        assert!(schedule.trips_for("Sunday", "A").is_empty());
    }

    #[test]
    fn stop_times_ordered_by_sequence() {
        let mut tables = read_archive(&full_archive()).unwrap();
        tables.stop_times.reverse();
        let schedule = Schedule::new(tables);

        let ordered: Vec<&str> = schedule
            .ordered_stop_times("A_T1")
            .iter()
            .map(|st| st.stop_id.as_str())
            .collect();
        assert_eq!(ordered, vec!["A46N", "101S"]);
        assert!(schedule.ordered_stop_times("missing").is_empty());
    }

    #[test]
    fn stop_times_at_stop() {
        let schedule = schedule();
        let at = schedule.stop_times_at("101S");
        assert_eq!(at.len(), 2);
        assert!(schedule.stop_times_at("nowhere").is_empty());
    }

    #[test]
    fn active_services_on_date() {
        let schedule = schedule();
        let friday = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let christmas = NaiveDate::from_ymd_opt(2024, 12, 25).unwrap();

        assert!(schedule.active_services(friday).contains("Weekday"));
        assert!(!schedule.active_services(christmas).contains("Weekday"));
    }

    #[test]
    fn derivations_are_deterministic() {
        let a = schedule();
        let b = schedule();
        assert_eq!(a.stations(), b.stations());
        assert_eq!(a.stop_names(), b.stop_names());
    }
}
