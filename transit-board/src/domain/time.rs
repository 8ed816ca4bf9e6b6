//! Timetable time handling.
//!
//! Static timetables give times of day as "H:MM:SS" strings relative to a
//! service day. Trips running past midnight keep counting, so "25:10:00" is
//! 01:10 on the calendar day after the service day. Dates are "YYYYMMDD".

use chrono::{DateTime, Duration, NaiveDate, TimeZone};
use std::fmt;

/// Error returned when parsing an invalid time or date string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A time of day on a service day, in seconds.
///
/// May exceed 24 hours for trips that continue past midnight.
///
/// # Examples
///
/// ```
/// use transit_board::domain::ScheduleTime;
///
/// let time = ScheduleTime::parse("25:10:00").unwrap();
/// assert_eq!(time.seconds(), 25 * 3600 + 10 * 60);
/// assert_eq!(time.to_string(), "25:10:00");
///
/// // Single-digit hours are allowed
/// assert_eq!(ScheduleTime::parse("8:05:00").unwrap().to_string(), "08:05:00");
///
/// assert!(ScheduleTime::parse("08:60:00").is_err());
/// assert!(ScheduleTime::parse("0805").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduleTime(u32);

impl ScheduleTime {
    /// Create a time from seconds past the start of the service day.
    pub fn from_seconds(seconds: u32) -> Self {
        Self(seconds)
    }

    /// Parse a time from "H:MM:SS" or "HH:MM:SS".
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        let mut parts = s.trim().split(':');
        let (Some(h), Some(m), Some(sec), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TimeError::new("expected H:MM:SS format"));
        };

        if h.is_empty() || h.len() > 3 || !h.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TimeError::new("invalid hour digits"));
        }
        let hours: u32 = h.parse().map_err(|_| TimeError::new("invalid hour digits"))?;

        let minutes =
            parse_two_digits(m.as_bytes()).ok_or_else(|| TimeError::new("invalid minute digits"))?;
        if minutes > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }

        let seconds = parse_two_digits(sec.as_bytes())
            .ok_or_else(|| TimeError::new("invalid second digits"))?;
        if seconds > 59 {
            return Err(TimeError::new("second must be 0-59"));
        }

        Ok(Self(hours * 3600 + minutes * 60 + seconds))
    }

    /// Seconds past the start of the service day.
    pub fn seconds(&self) -> u32 {
        self.0
    }

    /// The absolute instant of this time on `service_day` in `tz`.
    ///
    /// Service-day times are measured from "noon minus 12h" so that days
    /// with a daylight-saving transition still line up with the timetable.
    pub fn on_service_day<Tz: TimeZone>(
        &self,
        service_day: NaiveDate,
        tz: &Tz,
    ) -> Option<DateTime<Tz>> {
        let noon = service_day.and_hms_opt(12, 0, 0)?;
        let noon = tz.from_local_datetime(&noon).earliest()?;
        noon.checked_sub_signed(Duration::hours(12))?
            .checked_add_signed(Duration::seconds(i64::from(self.0)))
    }
}

impl fmt::Debug for ScheduleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScheduleTime({})", self)
    }
}

impl fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.0 / 3600,
            (self.0 / 60) % 60,
            self.0 % 60
        )
    }
}

/// Parse a "YYYYMMDD" service date.
///
/// ```
/// use transit_board::domain::parse_service_date;
/// use chrono::NaiveDate;
///
/// let date = parse_service_date("20241229").unwrap();
/// assert_eq!(date, NaiveDate::from_ymd_opt(2024, 12, 29).unwrap());
/// assert!(parse_service_date("2024-12-29").is_err());
/// ```
pub fn parse_service_date(s: &str) -> Result<NaiveDate, TimeError> {
    let s = s.trim();
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeError::new("expected YYYYMMDD format"));
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|_| TimeError::new("invalid calendar date"))
}

/// Format a date as "YYYYMMDD".
pub fn format_service_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Parse two ASCII digit bytes into a u32.
fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.len() != 2 {
        return None;
    }
    let d1 = (bytes[0] as char).to_digit(10)?;
    let d2 = (bytes[1] as char).to_digit(10)?;
    Some(d1 * 10 + d2)
}
