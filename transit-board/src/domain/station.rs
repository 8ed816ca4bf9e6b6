//! Station code types.

use std::fmt;

/// Error returned when parsing an invalid station code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid station code: {reason}")]
pub struct InvalidStationCode {
    reason: &'static str,
}

/// A valid 3-character station code (e.g. `A46`, `101`, `R01`).
///
/// Platform stops are named by appending a direction letter to the code of
/// the station they belong to, so `A46N` and `A46S` are the two platforms of
/// station `A46`.
///
/// # Examples
///
/// ```
/// use transit_board::domain::StationCode;
///
/// let code = StationCode::parse("A46").unwrap();
/// assert_eq!(code.as_str(), "A46");
///
/// // Lowercase is rejected
/// assert!(StationCode::parse("a46").is_err());
///
/// // Wrong length is rejected
/// assert!(StationCode::parse("A4").is_err());
/// assert!(StationCode::parse("A46N").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StationCode([u8; 3]);

impl StationCode {
    /// Parse a station code from a string.
    ///
    /// The input must be exactly 3 ASCII characters, each an uppercase
    /// letter or a digit.
    pub fn parse(s: &str) -> Result<Self, InvalidStationCode> {
        let bytes = s.as_bytes();

        if bytes.len() != 3 {
            return Err(InvalidStationCode {
                reason: "must be exactly 3 characters",
            });
        }

        for &b in bytes {
            if !(b.is_ascii_uppercase() || b.is_ascii_digit()) {
                return Err(InvalidStationCode {
                    reason: "must be uppercase ASCII letters or digits",
                });
            }
        }

        Ok(StationCode([bytes[0], bytes[1], bytes[2]]))
    }

    /// Parse a station code after trimming whitespace and uppercasing.
    pub fn parse_normalized(s: &str) -> Result<Self, InvalidStationCode> {
        Self::parse(&s.trim().to_ascii_uppercase())
    }

    /// Returns the station code as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ASCII bytes are ever stored.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// The conventional northbound/southbound platform ids for this station.
    pub fn default_platform_ids(&self) -> [String; 2] {
        [format!("{}N", self.as_str()), format!("{}S", self.as_str())]
    }
}

impl fmt::Debug for StationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationCode({})", self.as_str())
    }
}

impl fmt::Display for StationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The station code prefix of a stop id.
///
/// Returns `None` for ids too short to carry a station code.
///
/// ```
/// use transit_board::domain::station_code_of;
///
/// assert_eq!(station_code_of("A46N"), Some("A46"));
/// assert_eq!(station_code_of("A4"), None);
/// ```
pub fn station_code_of(stop_id: &str) -> Option<&str> {
    stop_id.get(..3)
}

/// The direction letter of a platform id (`N` for `A46N`).
pub fn direction_of(stop_id: &str) -> Option<char> {
    let suffix = stop_id.get(3..)?;
    let mut chars = suffix.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Some(c),
        _ => None,
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Roundtrip: parse then as_str returns the original
        #[test]
        fn roundtrip(s in "[A-Z0-9]{3}") {
            let code = StationCode::parse(&s).unwrap();
            prop_assert_eq!(code.as_str(), s.as_str());
        }

        /// Platform ids always map back to their station code
        #[test]
        fn platform_ids_prefix(s in "[A-Z0-9]{3}") {
            let code = StationCode::parse(&s).unwrap();
            for id in code.default_platform_ids() {
                prop_assert_eq!(station_code_of(&id), Some(code.as_str()));
                prop_assert!(direction_of(&id).is_some());
            }
        }

        /// Wrong-length strings are always rejected
        #[test]
        fn wrong_length_rejected(s in "[A-Z0-9]{0,2}|[A-Z0-9]{4,10}") {
            prop_assert!(StationCode::parse(&s).is_err());
        }
    }
}
