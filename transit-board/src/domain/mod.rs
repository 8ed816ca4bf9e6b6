//! Domain types for the departure board.
//!
//! Validated identifiers and times, the departure groups handed to the
//! display layer, and the data-quality findings raised along the way.

mod departure;
mod quality;
mod station;
mod time;

pub use departure::{Departure, DepartureSource};
pub use quality::DataQualityWarning;
pub use station::{InvalidStationCode, StationCode, direction_of, station_code_of};
pub use time::{ScheduleTime, TimeError, format_service_date, parse_service_date};
