//! Reading the timetable archive.
//!
//! The archive is a zip of CSV tables. Each table is decoded by header name
//! into its record type; columns the records don't declare are ignored.

use std::io::{Cursor, Read};

use serde::de::DeserializeOwned;
use tracing::info;
use zip::ZipArchive;
use zip::result::ZipError;

use super::error::ScheduleError;
use super::records::{Calendar, CalendarException, Route, Stop, StopTime, Trip};

/// Maximum total decompressed size of an archive (2 GB).
const MAX_DECOMPRESSED_SIZE: u64 = 2 * 1024 * 1024 * 1024;

pub const STOPS_FILE: &str = "stops.txt";
pub const STOP_TIMES_FILE: &str = "stop_times.txt";
pub const TRIPS_FILE: &str = "trips.txt";
pub const ROUTES_FILE: &str = "routes.txt";
pub const CALENDAR_FILE: &str = "calendar.txt";
pub const CALENDAR_DATES_FILE: &str = "calendar_dates.txt";

/// The raw static tables, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleTables {
    pub stops: Vec<Stop>,
    pub stop_times: Vec<StopTime>,
    pub trips: Vec<Trip>,
    pub routes: Vec<Route>,
    pub calendars: Vec<Calendar>,
    pub calendar_dates: Vec<CalendarException>,
}

impl ScheduleTables {
    /// Check that every table the board depends on has rows.
    ///
    /// Calendar tables may be empty: a feed can describe its services with
    /// either one alone.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.stops.is_empty() {
            return Err(ScheduleError::EmptyInput(STOPS_FILE));
        }
        if self.stop_times.is_empty() {
            return Err(ScheduleError::EmptyInput(STOP_TIMES_FILE));
        }
        if self.trips.is_empty() {
            return Err(ScheduleError::EmptyInput(TRIPS_FILE));
        }
        if self.routes.is_empty() {
            return Err(ScheduleError::EmptyInput(ROUTES_FILE));
        }
        Ok(())
    }
}

/// Decode all tables from a zip archive held in memory.
///
/// Blocking; call on `spawn_blocking` from async code.
pub fn read_archive(bytes: &[u8]) -> Result<ScheduleTables, ScheduleError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut total_uncompressed: u64 = 0;
    for i in 0..archive.len() {
        total_uncompressed += archive.by_index(i)?.size();
    }
    if total_uncompressed > MAX_DECOMPRESSED_SIZE {
        return Err(ScheduleError::TooLarge {
            bytes: total_uncompressed,
            limit: MAX_DECOMPRESSED_SIZE,
        });
    }

    let tables = ScheduleTables {
        stops: read_required(&mut archive, STOPS_FILE)?,
        stop_times: read_required(&mut archive, STOP_TIMES_FILE)?,
        trips: read_required(&mut archive, TRIPS_FILE)?,
        routes: read_required(&mut archive, ROUTES_FILE)?,
        calendars: read_optional(&mut archive, CALENDAR_FILE)?,
        calendar_dates: read_optional(&mut archive, CALENDAR_DATES_FILE)?,
    };
    tables.validate()?;

    info!(
        stops = tables.stops.len(),
        stop_times = tables.stop_times.len(),
        trips = tables.trips.len(),
        routes = tables.routes.len(),
        calendars = tables.calendars.len(),
        calendar_dates = tables.calendar_dates.len(),
        "Decoded schedule archive"
    );

    Ok(tables)
}

/// Decode every row of one CSV table.
pub fn read_table<T, R>(file: &'static str, reader: R) -> Result<Vec<T>, ScheduleError>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in rdr.deserialize() {
        rows.push(record.map_err(|source| ScheduleError::Decode { file, source })?);
    }
    Ok(rows)
}

fn read_required<T: DeserializeOwned>(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    file: &'static str,
) -> Result<Vec<T>, ScheduleError> {
    match archive.by_name(file) {
        Ok(entry) => read_table(file, entry),
        Err(ZipError::FileNotFound) => Err(ScheduleError::MissingFile(file)),
        Err(e) => Err(e.into()),
    }
}

fn read_optional<T: DeserializeOwned>(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    file: &'static str,
) -> Result<Vec<T>, ScheduleError> {
    match archive.by_name(file) {
        Ok(entry) => read_table(file, entry),
        Err(ZipError::FileNotFound) => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}
