//! Departures from live trip updates.

use crate::domain::{Departure, DepartureSource};
use crate::realtime::FeedSnapshot;
use crate::schedule::Schedule;

use super::{DepartureGroups, distinct};

/// Group live predictions at `stop_ids` by route and final stop.
///
/// A trip's final stop is the last stop-time update it lists, which may
/// differ from the timetable when service is short-turned. Updates with
/// neither a departure nor an arrival prediction are skipped.
pub fn resolve_realtime<S: AsRef<str>>(
    stop_ids: &[S],
    feeds: &[FeedSnapshot],
    schedule: &Schedule,
) -> Vec<Departure> {
    let mut groups = DepartureGroups::default();

    for stop_id in distinct(stop_ids) {
        for feed in feeds {
            for update in &feed.trip_updates {
                let Some(final_stop) = update.final_stop() else {
                    continue;
                };
                if final_stop.stop_id == stop_id {
                    continue;
                }

                for stop_time in update
                    .stop_time_updates
                    .iter()
                    .filter(|st| st.stop_id == stop_id)
                {
                    if let Some(instant) = stop_time.boarding_time() {
                        groups.record(&update.route_id, stop_id, &final_stop.stop_id, instant);
                    }
                }
            }
        }
    }

    groups.into_departures(schedule, DepartureSource::Realtime)
}
