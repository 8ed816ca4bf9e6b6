//! SQLite copy of the static timetable.
//!
//! Each sync replaces the whole timetable inside one transaction, so a
//! reader never sees a half-written schedule.

use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use tracing::{debug, info};

use crate::domain::{ScheduleTime, format_service_date, parse_service_date};
use crate::schedule::{
    Calendar, CalendarException, ExceptionType, LocationType, Route, ScheduleTables, Stop,
    StopTime, Trip,
};

/// Errors from the schedule store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS stops (
    stop_id         TEXT NOT NULL,
    stop_name       TEXT NOT NULL,
    stop_lat        REAL NOT NULL,
    stop_lon        REAL NOT NULL,
    location_type   INTEGER NOT NULL,
    parent_station  TEXT
);
CREATE TABLE IF NOT EXISTS routes (
    route_id         TEXT NOT NULL,
    agency_id        TEXT NOT NULL,
    route_short_name TEXT NOT NULL,
    route_long_name  TEXT NOT NULL,
    route_desc       TEXT NOT NULL,
    route_type       INTEGER NOT NULL,
    route_url        TEXT NOT NULL,
    route_color      TEXT NOT NULL,
    route_text_color TEXT NOT NULL,
    route_sort_order INTEGER
);
CREATE TABLE IF NOT EXISTS calendars (
    service_id  TEXT NOT NULL,
    monday      INTEGER NOT NULL,
    tuesday     INTEGER NOT NULL,
    wednesday   INTEGER NOT NULL,
    thursday    INTEGER NOT NULL,
    friday      INTEGER NOT NULL,
    saturday    INTEGER NOT NULL,
    sunday      INTEGER NOT NULL,
    start_date  TEXT NOT NULL,
    end_date    TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS trips (
    route_id       TEXT NOT NULL,
    trip_id        TEXT NOT NULL,
    service_id     TEXT NOT NULL,
    trip_headsign  TEXT NOT NULL,
    direction_id   INTEGER NOT NULL,
    shape_id       TEXT
);
CREATE TABLE IF NOT EXISTS stop_times (
    trip_id         TEXT NOT NULL,
    stop_id         TEXT NOT NULL,
    arrival_time    INTEGER,
    departure_time  INTEGER,
    stop_sequence   INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS calendar_dates (
    service_id      TEXT NOT NULL,
    date            TEXT NOT NULL,
    exception_type  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS stop_times_trip ON stop_times (trip_id);
CREATE INDEX IF NOT EXISTS stop_times_stop ON stop_times (stop_id);
";

/// Persistent timetable storage.
#[derive(Debug)]
pub struct ScheduleStore {
    conn: Connection,
}

impl ScheduleStore {
    /// Open (creating if needed) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    /// The timetable last stored at `path`, when there is a usable one.
    ///
    /// A missing file, or a store lacking any of the required tables, gives
    /// `None`.
    pub fn restore(path: &Path) -> Result<Option<ScheduleTables>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let tables = Self::open(path)?.load()?;
        if let Err(e) = tables.validate() {
            debug!(path = %path.display(), reason = %e, "Stored schedule unusable");
            return Ok(None);
        }
        Ok(Some(tables))
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Replace the stored timetable with `tables`.
    pub fn replace(&mut self, tables: &ScheduleTables) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;

        for table in [
            "calendar_dates",
            "stop_times",
            "trips",
            "calendars",
            "routes",
            "stops",
        ] {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO stops (stop_id, stop_name, stop_lat, stop_lon, location_type, parent_station)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for s in &tables.stops {
                stmt.execute(params![
                    s.stop_id,
                    s.stop_name,
                    s.stop_lat,
                    s.stop_lon,
                    s.location_type.code(),
                    s.parent_station,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO routes (route_id, agency_id, route_short_name, route_long_name, route_desc,
                                     route_type, route_url, route_color, route_text_color, route_sort_order)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for r in &tables.routes {
                stmt.execute(params![
                    r.route_id,
                    r.agency_id,
                    r.route_short_name,
                    r.route_long_name,
                    r.route_desc,
                    r.route_type,
                    r.route_url,
                    r.route_color,
                    r.route_text_color,
                    r.route_sort_order,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO calendars (service_id, monday, tuesday, wednesday, thursday, friday,
                                        saturday, sunday, start_date, end_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for c in &tables.calendars {
                stmt.execute(params![
                    c.service_id,
                    c.monday,
                    c.tuesday,
                    c.wednesday,
                    c.thursday,
                    c.friday,
                    c.saturday,
                    c.sunday,
                    format_service_date(c.start_date),
                    format_service_date(c.end_date),
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO trips (route_id, trip_id, service_id, trip_headsign, direction_id, shape_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for t in &tables.trips {
                stmt.execute(params![
                    t.route_id,
                    t.trip_id,
                    t.service_id,
                    t.trip_headsign,
                    t.direction_id,
                    t.shape_id,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO stop_times (trip_id, stop_id, arrival_time, departure_time, stop_sequence)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for st in &tables.stop_times {
                stmt.execute(params![
                    st.trip_id,
                    st.stop_id,
                    st.arrival_time.map(|t| t.seconds()),
                    st.departure_time.map(|t| t.seconds()),
                    st.stop_sequence,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO calendar_dates (service_id, date, exception_type) VALUES (?1, ?2, ?3)",
            )?;
            for e in &tables.calendar_dates {
                stmt.execute(params![
                    e.service_id,
                    format_service_date(e.date),
                    e.exception_type.code(),
                ])?;
            }
        }

        tx.commit()?;

        info!(
            stops = tables.stops.len(),
            stop_times = tables.stop_times.len(),
            "Stored schedule"
        );
        Ok(())
    }

    /// Read the stored timetable back, in insertion order.
    pub fn load(&self) -> Result<ScheduleTables, StoreError> {
        Ok(ScheduleTables {
            stops: self.select(
                "SELECT stop_id, stop_name, stop_lat, stop_lon, location_type, parent_station
                 FROM stops ORDER BY rowid",
                |row| {
                    Ok(Stop {
                        stop_id: row.get(0)?,
                        stop_name: row.get(1)?,
                        stop_lat: row.get(2)?,
                        stop_lon: row.get(3)?,
                        location_type: LocationType::from_code(row.get(4)?),
                        parent_station: row.get(5)?,
                    })
                },
            )?,
            routes: self.select(
                "SELECT route_id, agency_id, route_short_name, route_long_name, route_desc,
                        route_type, route_url, route_color, route_text_color, route_sort_order
                 FROM routes ORDER BY rowid",
                |row| {
                    Ok(Route {
                        route_id: row.get(0)?,
                        agency_id: row.get(1)?,
                        route_short_name: row.get(2)?,
                        route_long_name: row.get(3)?,
                        route_desc: row.get(4)?,
                        route_type: row.get(5)?,
                        route_url: row.get(6)?,
                        route_color: row.get(7)?,
                        route_text_color: row.get(8)?,
                        route_sort_order: row.get(9)?,
                    })
                },
            )?,
            calendars: self.select(
                "SELECT service_id, monday, tuesday, wednesday, thursday, friday, saturday, sunday,
                        start_date, end_date
                 FROM calendars ORDER BY rowid",
                |row| {
                    Ok(Calendar {
                        service_id: row.get(0)?,
                        monday: row.get(1)?,
                        tuesday: row.get(2)?,
                        wednesday: row.get(3)?,
                        thursday: row.get(4)?,
                        friday: row.get(5)?,
                        saturday: row.get(6)?,
                        sunday: row.get(7)?,
                        start_date: date_column(row, 8)?,
                        end_date: date_column(row, 9)?,
                    })
                },
            )?,
            trips: self.select(
                "SELECT route_id, trip_id, service_id, trip_headsign, direction_id, shape_id
                 FROM trips ORDER BY rowid",
                |row| {
                    Ok(Trip {
                        route_id: row.get(0)?,
                        trip_id: row.get(1)?,
                        service_id: row.get(2)?,
                        trip_headsign: row.get(3)?,
                        direction_id: row.get(4)?,
                        shape_id: row.get(5)?,
                    })
                },
            )?,
            stop_times: self.select(
                "SELECT trip_id, stop_id, arrival_time, departure_time, stop_sequence
                 FROM stop_times ORDER BY rowid",
                |row| {
                    Ok(StopTime {
                        trip_id: row.get(0)?,
                        stop_id: row.get(1)?,
                        arrival_time: row.get::<_, Option<u32>>(2)?.map(ScheduleTime::from_seconds),
                        departure_time: row
                            .get::<_, Option<u32>>(3)?
                            .map(ScheduleTime::from_seconds),
                        stop_sequence: row.get(4)?,
                    })
                },
            )?,
            calendar_dates: self.select(
                "SELECT service_id, date, exception_type FROM calendar_dates ORDER BY rowid",
                |row| {
                    Ok(CalendarException {
                        service_id: row.get(0)?,
                        date: date_column(row, 1)?,
                        exception_type: ExceptionType::from_code(row.get(2)?),
                    })
                },
            )?,
        })
    }

    fn select<T>(
        &self,
        sql: &str,
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], map)?;
        Ok(rows.collect::<rusqlite::Result<Vec<T>>>()?)
    }
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<chrono::NaiveDate> {
    let raw: String = row.get(idx)?;
    parse_service_date(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
