//! Departure resolution.
//!
//! Turns live trip updates (or, without them, the timetable) into
//! [`Departure`] groups for a set of boarding stops. A group is keyed by
//! route, boarding stop and final stop; trips that end at the boarding stop
//! are never listed.

mod realtime;
mod scheduled;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::domain::{DataQualityWarning, Departure, DepartureSource};
use crate::realtime::FeedSnapshot;
use crate::schedule::Schedule;

pub use realtime::resolve_realtime;
pub use scheduled::resolve_scheduled;

/// How far ahead the timetable fallback looks by default.
pub const DEFAULT_HORIZON: Duration = Duration::hours(12);

/// Time context for a resolution.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    pub now: DateTime<Utc>,
    /// Agency time zone the timetable is written in.
    pub timezone: Tz,
    /// Scheduled departures later than `now + horizon` are left out.
    pub horizon: Duration,
}

impl Clock {
    pub fn new(now: DateTime<Utc>, timezone: Tz) -> Self {
        Self {
            now,
            timezone,
            horizon: DEFAULT_HORIZON,
        }
    }

    pub fn with_horizon(mut self, horizon: Duration) -> Self {
        self.horizon = horizon;
        self
    }
}

/// Resolve departures from the best data available.
///
/// Live feeds are used whenever a realtime snapshot exists; the timetable
/// is only consulted while none has arrived yet.
pub fn resolve_departures<S: AsRef<str>>(
    stop_ids: &[S],
    realtime: Option<&[FeedSnapshot]>,
    schedule: &Schedule,
    clock: &Clock,
) -> Vec<Departure> {
    match realtime {
        Some(feeds) => resolve_realtime(stop_ids, feeds, schedule),
        None => resolve_scheduled(stop_ids, schedule, clock),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DepartureKey {
    route_id: String,
    stop_id: String,
    final_stop_id: String,
}

/// Departure instants collected per key. Ordering is applied on emission.
#[derive(Debug, Default)]
struct DepartureGroups {
    groups: HashMap<DepartureKey, Vec<i64>>,
}

impl DepartureGroups {
    fn record(&mut self, route_id: &str, stop_id: &str, final_stop_id: &str, instant: i64) {
        let key = DepartureKey {
            route_id: route_id.to_string(),
            stop_id: stop_id.to_string(),
            final_stop_id: final_stop_id.to_string(),
        };
        self.groups.entry(key).or_default().push(instant);
    }

    fn into_departures(self, schedule: &Schedule, source: DepartureSource) -> Vec<Departure> {
        let mut unnamed = HashSet::new();

        let mut departures: Vec<Departure> = self
            .groups
            .into_iter()
            .map(|(key, mut times)| {
                times.sort_unstable();
                let final_stop_name = match schedule.stop_name(&key.final_stop_id) {
                    Some(name) => name.to_string(),
                    None => {
                        if unnamed.insert(key.final_stop_id.clone()) {
                            let warning = DataQualityWarning::UnknownStopName {
                                stop_id: key.final_stop_id.clone(),
                            };
                            warn!(%warning, "Data quality");
                        }
                        String::new()
                    }
                };
                Departure {
                    route_id: key.route_id,
                    stop_id: key.stop_id,
                    final_stop_id: key.final_stop_id,
                    final_stop_name,
                    times,
                    source,
                }
            })
            .collect();

        departures.sort_by(|a, b| {
            a.final_stop_name
                .cmp(&b.final_stop_name)
                .then_with(|| a.route_id.cmp(&b.route_id))
                .then_with(|| a.stop_id.cmp(&b.stop_id))
                .then_with(|| a.final_stop_id.cmp(&b.final_stop_id))
        });
        departures
    }
}

/// Stop ids with duplicates removed, first occurrence kept.
fn distinct<S: AsRef<str>>(stop_ids: &[S]) -> Vec<&str> {
    let mut seen = HashSet::new();
    stop_ids
        .iter()
        .map(AsRef::as_ref)
        .filter(|id| seen.insert(*id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::fixtures::{feed_message, stu, trip_entity};
    use crate::schedule::fixtures::full_archive;
    use crate::schedule::read_archive;
    use chrono::TimeZone;

    fn schedule() -> Schedule {
        Schedule::new(read_archive(&full_archive()).unwrap())
    }

    fn friday_morning() -> Clock {
        let now = chrono_tz::America::New_York
            .with_ymd_and_hms(2024, 3, 15, 7, 30, 0)
            .unwrap()
            .with_timezone(&Utc);
        Clock::new(now, chrono_tz::America::New_York)
    }

    #[test]
    fn distinct_keeps_first_occurrence() {
        assert_eq!(distinct(&["A46N", "A46S", "A46N"]), vec!["A46N", "A46S"]);
    }

    #[test]
    fn emission_sorts_by_destination_then_route() {
        let mut groups = DepartureGroups::default();
        groups.record("1", "A46N", "101S", 30);
        groups.record("A", "A46N", "A46S", 20);
        groups.record("1", "A46N", "101S", 10);
        groups.record("A", "A46N", "101S", 5);

        let departures = groups.into_departures(&schedule(), DepartureSource::Realtime);
        let keys: Vec<(&str, &str)> = departures
            .iter()
            .map(|d| (d.route_id.as_str(), d.final_stop_name.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("A", "Utica Av"),
                ("1", "Van Cortlandt Park-242 St"),
                ("A", "Van Cortlandt Park-242 St"),
            ]
        );
        assert_eq!(departures[1].times, vec![10, 30]);
    }

    #[test]
    fn unknown_final_stop_has_empty_name() {
        let mut groups = DepartureGroups::default();
        groups.record("A", "A46N", "XYZS", 1);

        let departures = groups.into_departures(&schedule(), DepartureSource::Realtime);
        assert_eq!(departures[0].final_stop_name, "");
    }

    #[test]
    fn realtime_snapshot_takes_precedence() {
        let clock = friday_morning();
        let now = clock.now.timestamp();
        let feeds = vec![FeedSnapshot::from_message(
            "gtfs",
            feed_message(vec![trip_entity(
                "e1",
                "1",
                vec![stu("A46N", now + 180), stu("101S", now + 900)],
            )]),
        )];

        let live = resolve_departures(&["A46N"], Some(feeds.as_slice()), &schedule(), &clock);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].route_id, "1");
        assert_eq!(live[0].source, DepartureSource::Realtime);

        let fallback = resolve_departures(&["A46N"], None, &schedule(), &clock);
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback[0].route_id, "A");
        assert_eq!(fallback[0].source, DepartureSource::Scheduled);
    }
}
