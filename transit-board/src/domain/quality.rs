//! Data-quality findings.
//!
//! These never abort a resolution. They are logged and handed back to the
//! caller so degraded output can be explained.

use chrono::NaiveDate;

/// A problem in the input data that was worked around.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataQualityWarning {
    /// A calendar exception carried an exception type other than 1 or 2.
    #[error("service {service_id} on {date}: unrecognized exception type {value}")]
    UnknownExceptionType {
        service_id: String,
        date: NaiveDate,
        value: i64,
    },

    /// More than one exception for the same service and date.
    /// The last one in input order was applied.
    #[error("service {service_id} on {date}: multiple exceptions, last one applied")]
    DuplicateException { service_id: String, date: NaiveDate },

    /// A final stop id has no entry in the stops table.
    #[error("stop {stop_id} has no name in the schedule")]
    UnknownStopName { stop_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_display() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 25).unwrap();

        let w = DataQualityWarning::UnknownExceptionType {
            service_id: "Weekday".into(),
            date,
            value: 7,
        };
        assert_eq!(
            w.to_string(),
            "service Weekday on 2024-12-25: unrecognized exception type 7"
        );

        let w = DataQualityWarning::DuplicateException {
            service_id: "Sunday".into(),
            date,
        };
        assert_eq!(
            w.to_string(),
            "service Sunday on 2024-12-25: multiple exceptions, last one applied"
        );

        let w = DataQualityWarning::UnknownStopName {
            stop_id: "XYZS".into(),
        };
        assert_eq!(w.to_string(), "stop XYZS has no name in the schedule");
    }
}
