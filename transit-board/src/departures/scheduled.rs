//! Departures from the timetable alone.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};

use crate::domain::{Departure, DepartureSource};
use crate::schedule::Schedule;

use super::{Clock, DepartureGroups, distinct};

/// Scheduled departures are kept for this long after they are due.
const GRACE: Duration = Duration::minutes(1);

/// Group timetable departures at `stop_ids` by route and final stop.
///
/// Both today's and yesterday's service days are searched, since a trip
/// timed past `24:00:00` runs on the calendar day after its service day.
/// Only instants in `[now - 1 min, now + horizon]` are kept; a horizon
/// reaching past the representable range is clamped to it.
pub fn resolve_scheduled<S: AsRef<str>>(
    stop_ids: &[S],
    schedule: &Schedule,
    clock: &Clock,
) -> Vec<Departure> {
    let tz = clock.timezone;
    let earliest = clock
        .now
        .checked_sub_signed(GRACE)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
        .timestamp();
    let latest = clock
        .now
        .checked_add_signed(clock.horizon)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
        .timestamp();

    let today = clock.now.with_timezone(&tz).date_naive();
    let service_days = [today.pred_opt(), Some(today)];

    let stop_ids = distinct(stop_ids);
    let routes = routes_calling_at(schedule, &stop_ids);
    let mut groups = DepartureGroups::default();

    for service_day in service_days.into_iter().flatten() {
        let active = schedule.active_services(service_day);

        for service_id in active.services() {
            for &route_id in &routes {
                for trip in schedule.trips_for(service_id, route_id) {
                    let stop_times = schedule.ordered_stop_times(&trip.trip_id);
                    let Some(final_stop) = stop_times.last() else {
                        continue;
                    };

                    for stop_time in &stop_times {
                        let stop_id = stop_time.stop_id.as_str();
                        if stop_id == final_stop.stop_id || !stop_ids.contains(&stop_id) {
                            continue;
                        }
                        let Some(instant) = stop_time
                            .boarding_time()
                            .and_then(|t| t.on_service_day(service_day, &tz))
                            .map(|t| t.timestamp())
                        else {
                            continue;
                        };

                        if (earliest..=latest).contains(&instant) {
                            groups.record(route_id, stop_id, &final_stop.stop_id, instant);
                        }
                    }
                }
            }
        }
    }

    groups.into_departures(schedule, DepartureSource::Scheduled)
}

/// Routes with at least one trip calling at any of `stop_ids`.
fn routes_calling_at<'a>(schedule: &'a Schedule, stop_ids: &[&str]) -> BTreeSet<&'a str> {
    stop_ids
        .iter()
        .flat_map(|stop_id| schedule.stop_times_at(stop_id))
        .filter_map(|stop_time| schedule.trip(&stop_time.trip_id))
        .map(|trip| trip.route_id.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScheduleTime;
    use crate::schedule::fixtures::full_archive;
    use crate::schedule::{StopTime, read_archive};
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    fn schedule() -> Schedule {
        let mut tables = read_archive(&full_archive()).unwrap();
        // Extend the late-night 1 train so it has somewhere to go after 101S
        tables.stop_times.push(StopTime {
            trip_id: "1_T1".into(),
            stop_id: "A46S".into(),
            arrival_time: Some(ScheduleTime::parse("24:40:00").unwrap()),
            departure_time: Some(ScheduleTime::parse("24:40:00").unwrap()),
            stop_sequence: 2,
        });
        Schedule::new(tables)
    }

    fn clock_at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Clock {
        let now = New_York
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc);
        Clock::new(now, New_York)
    }

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> i64 {
        New_York
            .with_ymd_and_hms(y, m, d, h, min, s)
            .unwrap()
            .timestamp()
    }

    #[test]
    fn upcoming_weekday_departure() {
        let departures = resolve_scheduled(&["A46N"], &schedule(), &clock_at(2024, 3, 15, 7, 30));

        assert_eq!(
            departures,
            vec![Departure {
                route_id: "A".into(),
                stop_id: "A46N".into(),
                final_stop_id: "101S".into(),
                final_stop_name: "Van Cortlandt Park-242 St".into(),
                times: vec![local(2024, 3, 15, 8, 0, 30)],
                source: DepartureSource::Scheduled,
            }]
        );
    }

    #[test]
    fn inactive_service_day_has_nothing() {
        // Saturday morning: no weekday service today, and Friday's trips
        // are long gone
        let departures = resolve_scheduled(&["A46N"], &schedule(), &clock_at(2024, 3, 16, 7, 30));
        assert!(departures.is_empty());
    }

    #[test]
    fn removed_by_exception() {
        // Christmas 2024 is a Wednesday with weekday service removed
        let departures = resolve_scheduled(&["A46N"], &schedule(), &clock_at(2024, 12, 25, 7, 30));
        assert!(departures.is_empty());
    }

    #[test]
    fn after_midnight_trip_belongs_to_previous_service_day() {
        // Saturday 00:05; the 24:10 departure ran on Friday's service
        let departures = resolve_scheduled(&["101S"], &schedule(), &clock_at(2024, 3, 16, 0, 5));

        assert_eq!(departures.len(), 1);
        assert_eq!(departures[0].route_id, "1");
        assert_eq!(departures[0].final_stop_id, "A46S");
        assert_eq!(departures[0].final_stop_name, "Utica Av");
        assert_eq!(departures[0].times, vec![local(2024, 3, 16, 0, 10, 0)]);
    }

    #[test]
    fn window_bounds() {
        // Just departed (30s ago) is still listed
        let departures = resolve_scheduled(
            &["A46N"],
            &schedule(),
            &Clock::new(
                Utc.timestamp_opt(local(2024, 3, 15, 8, 1, 0), 0).unwrap(),
                New_York,
            ),
        );
        assert_eq!(departures.len(), 1);

        // Two minutes late is not
        let departures = resolve_scheduled(
            &["A46N"],
            &schedule(),
            &Clock::new(
                Utc.timestamp_opt(local(2024, 3, 15, 8, 2, 31), 0).unwrap(),
                New_York,
            ),
        );
        assert!(departures.is_empty());

        // Beyond a short horizon
        let departures = resolve_scheduled(
            &["A46N"],
            &schedule(),
            &clock_at(2024, 3, 15, 7, 30).with_horizon(Duration::minutes(15)),
        );
        assert!(departures.is_empty());
    }

    #[test]
    fn unbounded_horizon_is_clamped() {
        let clock = clock_at(2024, 3, 15, 7, 30).with_horizon(Duration::MAX);
        let departures = resolve_scheduled(&["A46N"], &schedule(), &clock);
        assert_eq!(departures.len(), 1);
        assert_eq!(departures[0].times, vec![local(2024, 3, 15, 8, 0, 30)]);

        let late =
            Clock::new(DateTime::<Utc>::MAX_UTC, New_York).with_horizon(Duration::hours(1));
        assert!(resolve_scheduled(&["A46N"], &schedule(), &late).is_empty());
    }

    #[test]
    fn duplicate_stop_ids_count_once() {
        let departures =
            resolve_scheduled(&["A46N", "A46N"], &schedule(), &clock_at(2024, 3, 15, 7, 30));
        assert_eq!(departures.len(), 1);
        assert_eq!(departures[0].times.len(), 1);
    }

    #[test]
    fn final_stop_is_never_the_boarding_stop() {
        // A_T1 ends at 101S
        let departures = resolve_scheduled(&["101S"], &schedule(), &clock_at(2024, 3, 15, 7, 30));
        assert!(departures.iter().all(|d| d.final_stop_id != d.stop_id));
        assert!(departures.iter().all(|d| d.route_id != "A"));
    }
}
