//! Static timetable records.
//!
//! One struct per table, decoded from CSV by header name. Numeric and boolean
//! cells are lenient: an empty cell decodes as zero/false. Anything else that
//! fails to parse is a hard decode error for the whole file.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer};

use crate::domain::{ScheduleTime, parse_service_date};

/// Kind of stop (`location_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LocationType {
    /// A boardable stop or platform (0, or empty).
    #[default]
    Platform,
    /// A station grouping platforms (1).
    Station,
    /// Entrances, nodes and boarding areas. Not used by the board.
    Other(i64),
}

impl LocationType {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => LocationType::Platform,
            1 => LocationType::Station,
            other => LocationType::Other(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            LocationType::Platform => 0,
            LocationType::Station => 1,
            LocationType::Other(code) => *code,
        }
    }
}

impl<'de> Deserialize<'de> for LocationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient_int(deserializer).map(LocationType::from_code)
    }
}

/// Calendar exception kind (`exception_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionType {
    /// Service added for the date (1).
    Added,
    /// Service removed for the date (2).
    Removed,
    /// Any other value, reported as a data-quality warning.
    Unknown(i64),
}

impl ExceptionType {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => ExceptionType::Added,
            2 => ExceptionType::Removed,
            other => ExceptionType::Unknown(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            ExceptionType::Added => 1,
            ExceptionType::Removed => 2,
            ExceptionType::Unknown(code) => *code,
        }
    }
}

impl<'de> Deserialize<'de> for ExceptionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient_int(deserializer).map(ExceptionType::from_code)
    }
}

/// A row of `stops.txt`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Stop {
    pub stop_id: String,
    #[serde(default)]
    pub stop_name: String,
    #[serde(default, deserialize_with = "lenient_float")]
    pub stop_lat: f64,
    #[serde(default, deserialize_with = "lenient_float")]
    pub stop_lon: f64,
    #[serde(default)]
    pub location_type: LocationType,
    #[serde(default, deserialize_with = "optional_string")]
    pub parent_station: Option<String>,
}

/// A row of `routes.txt`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Route {
    pub route_id: String,
    #[serde(default)]
    pub agency_id: String,
    #[serde(default)]
    pub route_short_name: String,
    #[serde(default)]
    pub route_long_name: String,
    #[serde(default)]
    pub route_desc: String,
    #[serde(default, deserialize_with = "lenient_int")]
    pub route_type: i32,
    #[serde(default)]
    pub route_url: String,
    #[serde(default)]
    pub route_color: String,
    #[serde(default)]
    pub route_text_color: String,
    #[serde(default, deserialize_with = "optional_int")]
    pub route_sort_order: Option<u32>,
}

/// A row of `trips.txt`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Trip {
    pub route_id: String,
    pub trip_id: String,
    pub service_id: String,
    #[serde(default)]
    pub trip_headsign: String,
    #[serde(default, deserialize_with = "lenient_int")]
    pub direction_id: u8,
    #[serde(default, deserialize_with = "optional_string")]
    pub shape_id: Option<String>,
}

/// A row of `stop_times.txt`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StopTime {
    pub trip_id: String,
    pub stop_id: String,
    #[serde(default, deserialize_with = "optional_time")]
    pub arrival_time: Option<ScheduleTime>,
    #[serde(default, deserialize_with = "optional_time")]
    pub departure_time: Option<ScheduleTime>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub stop_sequence: u32,
}

impl StopTime {
    /// The time a rider can board here: departure, else arrival.
    pub fn boarding_time(&self) -> Option<ScheduleTime> {
        self.departure_time.or(self.arrival_time)
    }
}

/// A row of `calendar.txt`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Calendar {
    pub service_id: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub monday: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub tuesday: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub wednesday: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub thursday: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub friday: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub saturday: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub sunday: bool,
    #[serde(deserialize_with = "service_date")]
    pub start_date: NaiveDate,
    #[serde(deserialize_with = "service_date")]
    pub end_date: NaiveDate,
}

impl Calendar {
    /// Whether the weekday flag for `weekday` is set.
    pub fn runs_on(&self, weekday: Weekday) -> bool {
        match weekday {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    /// Whether `date` falls inside `[start_date, end_date]`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Whether the calendar alone makes the service run on `date`.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.covers(date) && self.runs_on(date.weekday())
    }
}

/// A row of `calendar_dates.txt`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CalendarException {
    pub service_id: String,
    #[serde(deserialize_with = "service_date")]
    pub date: NaiveDate,
    pub exception_type: ExceptionType,
}

fn lenient_int<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
    T::Err: fmt::Display,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(T::default());
    }
    raw.parse().map_err(serde::de::Error::custom)
}

fn optional_int<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(serde::de::Error::custom)
}

fn lenient_float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    lenient_int(deserializer)
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim() {
        "" | "0" => Ok(false),
        "1" => Ok(true),
        other if other.eq_ignore_ascii_case("true") => Ok(true),
        other if other.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid boolean value: {other:?}"
        ))),
    }
}

fn optional_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    Ok((!raw.is_empty()).then(|| raw.to_string()))
}

fn optional_time<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ScheduleTime>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    ScheduleTime::parse(raw)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

fn service_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_service_date(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar(days: [bool; 7]) -> Calendar {
        Calendar {
            service_id: "Weekday".into(),
            monday: days[0],
            tuesday: days[1],
            wednesday: days[2],
            thursday: days[3],
            friday: days[4],
            saturday: days[5],
            sunday: days[6],
            start_date: date(2024, 1, 1),
            end_date: date(2024, 12, 31),
        }
    }

    #[test]
    fn location_type_codes() {
        assert_eq!(LocationType::from_code(0), LocationType::Platform);
        assert_eq!(LocationType::from_code(1), LocationType::Station);
        assert_eq!(LocationType::from_code(2), LocationType::Other(2));
        assert_eq!(LocationType::Other(3).code(), 3);
    }

    #[test]
    fn exception_type_codes() {
        assert_eq!(ExceptionType::from_code(1), ExceptionType::Added);
        assert_eq!(ExceptionType::from_code(2), ExceptionType::Removed);
        assert_eq!(ExceptionType::from_code(0), ExceptionType::Unknown(0));
        assert_eq!(ExceptionType::Removed.code(), 2);
    }

    #[test]
    fn calendar_weekday_flags() {
        let weekdays = calendar([true, true, true, true, true, false, false]);
        // 2024-03-15 is a Friday, 2024-03-16 a Saturday
        assert!(weekdays.is_active_on(date(2024, 3, 15)));
        assert!(!weekdays.is_active_on(date(2024, 3, 16)));
    }

    #[test]
    fn calendar_range_is_inclusive() {
        let every_day = calendar([true; 7]);
        assert!(every_day.covers(date(2024, 1, 1)));
        assert!(every_day.covers(date(2024, 12, 31)));
        assert!(!every_day.covers(date(2023, 12, 31)));
        assert!(!every_day.covers(date(2025, 1, 1)));
    }

    #[test]
    fn boarding_time_prefers_departure() {
        let mut st = StopTime {
            trip_id: "T1".into(),
            stop_id: "A46N".into(),
            arrival_time: Some(ScheduleTime::from_seconds(100)),
            departure_time: Some(ScheduleTime::from_seconds(130)),
            stop_sequence: 1,
        };
        assert_eq!(st.boarding_time(), Some(ScheduleTime::from_seconds(130)));

        st.departure_time = None;
        assert_eq!(st.boarding_time(), Some(ScheduleTime::from_seconds(100)));
    }
}
