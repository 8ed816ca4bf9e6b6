//! Schedule sync error types.

/// Errors that can occur while fetching or decoding the static timetable.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Authentication failed
    #[error("unauthorized: check TRANSIT_API_KEY")]
    Unauthorized,

    /// Server returned an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Reading a local archive failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive itself is unreadable
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The archive would decompress to more than the allowed size
    #[error("archive too large: {bytes} bytes uncompressed (limit {limit})")]
    TooLarge { bytes: u64, limit: u64 },

    /// A table has a malformed row or value
    #[error("failed to decode {file}: {source}")]
    Decode {
        file: &'static str,
        #[source]
        source: csv::Error,
    },

    /// A required table is not in the archive
    #[error("missing required file {0}")]
    MissingFile(&'static str),

    /// A required table has no rows
    #[error("{0} has no rows")]
    EmptyInput(&'static str),

    /// A blocking decode task panicked or was cancelled
    #[error("decode task failed: {0}")]
    Task(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ScheduleError::MissingFile("stops.txt");
        assert_eq!(err.to_string(), "missing required file stops.txt");

        let err = ScheduleError::EmptyInput("trips.txt");
        assert_eq!(err.to_string(), "trips.txt has no rows");

        let err = ScheduleError::Api {
            status: 503,
            message: "Service Unavailable".into(),
        };
        assert_eq!(err.to_string(), "API error 503: Service Unavailable");

        let err = ScheduleError::TooLarge {
            bytes: 10,
            limit: 5,
        };
        assert!(err.to_string().contains("limit 5"));
    }
}
