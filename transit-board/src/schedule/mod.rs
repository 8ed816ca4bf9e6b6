//! Static timetable: decoding, calendar resolution and indexing.
//!
//! The timetable arrives as a zip archive of CSV tables. It changes slowly
//! (the default sync is hourly) and each sync yields a fresh, immutable
//! [`Schedule`].

mod archive;
mod calendar;
mod client;
mod error;
mod index;
mod records;

pub use archive::{
    CALENDAR_DATES_FILE, CALENDAR_FILE, ROUTES_FILE, STOP_TIMES_FILE, STOPS_FILE, TRIPS_FILE,
    ScheduleTables, read_archive, read_table,
};
pub use calendar::{ActiveServices, active_services};
pub use client::{DEFAULT_SCHEDULE_URL, ScheduleClient, ScheduleClientConfig, ScheduleLocation};
pub use error::ScheduleError;
pub use index::{Schedule, Station};
pub use records::{Calendar, CalendarException, ExceptionType, LocationType, Route, Stop, StopTime, Trip};

#[cfg(test)]
pub(crate) use archive::tests as fixtures;
