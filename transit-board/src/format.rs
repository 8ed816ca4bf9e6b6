//! "Minutes until" rendering for departure boards.

use serde::Serialize;

/// How many upcoming departures a board row shows by default.
pub const DEFAULT_MAX_UPCOMING: usize = 3;

/// The next few departures of a row, as minute tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "minutes", rename_all = "snake_case")]
pub enum Upcoming {
    /// Tokens are `"Now"` or a whole number of minutes, soonest first.
    Departures(Vec<String>),
    NoDepartures,
}

impl Upcoming {
    pub fn has_any(&self) -> bool {
        matches!(self, Upcoming::Departures(_))
    }

    pub fn tokens(&self) -> &[String] {
        match self {
            Upcoming::Departures(tokens) => tokens,
            Upcoming::NoDepartures => &[],
        }
    }

    /// One-line form, e.g. `"Now, 8 min"` or `"No Departures"`.
    ///
    /// The `min` suffix is left off when the last token is `"Now"`.
    pub fn summary(&self) -> String {
        match self {
            Upcoming::NoDepartures => "No Departures".to_string(),
            Upcoming::Departures(tokens) => {
                let joined = tokens.join(", ");
                match tokens.last() {
                    Some(last) if last == "Now" => joined,
                    _ => format!("{joined} min"),
                }
            }
        }
    }
}

/// Minutes until each departure, soonest first, at most `max_count`.
///
/// Minutes are rounded to the nearest whole minute (halves away from
/// zero). Departures that round to a negative number are dropped; those
/// that round to zero read `"Now"`.
///
/// ```
/// use transit_board::format::{Upcoming, format_upcoming};
///
/// let now = 1_700_000_000;
/// let upcoming = format_upcoming(&[now + 601, now, now + 90], now, 3);
/// assert_eq!(upcoming.tokens(), ["Now", "2", "10"]);
/// assert_eq!(upcoming.summary(), "Now, 2, 10 min");
/// assert_eq!(format_upcoming(&[], now, 3), Upcoming::NoDepartures);
/// ```
pub fn format_upcoming(instants: &[i64], now: i64, max_count: usize) -> Upcoming {
    let mut sorted = instants.to_vec();
    sorted.sort_unstable();

    let mut tokens = Vec::new();
    for instant in sorted {
        if tokens.len() == max_count {
            break;
        }
        let minutes = (instant.saturating_sub(now) as f64 / 60.0).round();
        if minutes > 0.0 {
            tokens.push(format!("{minutes}"));
        } else if minutes == 0.0 {
            tokens.push("Now".to_string());
        }
    }

    if tokens.is_empty() {
        Upcoming::NoDepartures
    } else {
        Upcoming::Departures(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn tokens(upcoming: &Upcoming) -> Vec<&str> {
        upcoming.tokens().iter().map(String::as_str).collect()
    }

    #[test]
    fn now_and_minutes() {
        let upcoming = format_upcoming(&[NOW, NOW + 90, NOW + 601], NOW, 3);
        assert_eq!(tokens(&upcoming), vec!["Now", "2", "10"]);
    }

    #[test]
    fn empty_input_has_no_departures() {
        let upcoming = format_upcoming(&[], NOW, 3);
        assert_eq!(upcoming, Upcoming::NoDepartures);
        assert!(!upcoming.has_any());
        assert_eq!(upcoming.summary(), "No Departures");
    }

    #[test]
    fn past_departures_are_dropped() {
        let upcoming = format_upcoming(&[NOW - 600, NOW - 31, NOW + 120], NOW, 3);
        assert_eq!(tokens(&upcoming), vec!["2"]);

        let upcoming = format_upcoming(&[NOW - 600], NOW, 3);
        assert_eq!(upcoming, Upcoming::NoDepartures);
    }

    #[test]
    fn just_departed_reads_now() {
        // -29s rounds to zero minutes
        let upcoming = format_upcoming(&[NOW - 29], NOW, 3);
        assert_eq!(tokens(&upcoming), vec!["Now"]);
    }

    #[test]
    fn half_minutes_round_away_from_zero() {
        let upcoming = format_upcoming(&[NOW + 30, NOW + 150], NOW, 3);
        assert_eq!(tokens(&upcoming), vec!["1", "3"]);
    }

    #[test]
    fn capped_at_max_count() {
        let instants: Vec<i64> = (1..=10).map(|m| NOW + m * 60).collect();
        assert_eq!(tokens(&format_upcoming(&instants, NOW, 3)), vec!["1", "2", "3"]);
        assert_eq!(tokens(&format_upcoming(&instants, NOW, 2)), vec!["1", "2"]);
    }

    #[test]
    fn unsorted_input() {
        let upcoming = format_upcoming(&[NOW + 600, NOW + 60, NOW + 300], NOW, 3);
        assert_eq!(tokens(&upcoming), vec!["1", "5", "10"]);
    }

    #[test]
    fn extreme_instants() {
        let upcoming = format_upcoming(&[i64::MIN, i64::MIN + 1], NOW, 3);
        assert_eq!(upcoming, Upcoming::NoDepartures);

        let upcoming = format_upcoming(&[i64::MAX, NOW + 60, i64::MIN], NOW, 3);
        let tokens = tokens(&upcoming);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], "1");
        assert!(tokens[1].parse::<f64>().unwrap() > 1e15);
    }

    #[test]
    fn summary_suffix() {
        let upcoming = format_upcoming(&[NOW, NOW + 480], NOW, 3);
        assert_eq!(upcoming.summary(), "Now, 8 min");

        let upcoming = format_upcoming(&[NOW], NOW, 3);
        assert_eq!(upcoming.summary(), "Now");

        let upcoming = format_upcoming(&[NOW + 60], NOW, 3);
        assert_eq!(upcoming.summary(), "1 min");
        assert!(upcoming.has_any());
    }
}
