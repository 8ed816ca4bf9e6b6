//! Decoded realtime data.
//!
//! The wire messages in [`super::proto`] are flattened into these plain
//! types as soon as a payload is decoded, so nothing downstream touches
//! protobuf optionals.

use prost::Message;

use super::proto;

pub use super::proto::{StopScheduleRelationship, TripScheduleRelationship};

/// Trip updates from one feed source at one point in time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedSnapshot {
    /// Name of the source that produced this snapshot
    pub source: String,
    /// Feed header timestamp, POSIX seconds
    pub timestamp: Option<i64>,
    pub trip_updates: Vec<TripUpdate>,
}

impl FeedSnapshot {
    /// Decode a `FeedMessage` payload.
    ///
    /// Entities without a trip update, and entities flagged as deleted, are
    /// skipped.
    pub fn decode(source: impl Into<String>, bytes: &[u8]) -> Result<Self, prost::DecodeError> {
        let message = proto::FeedMessage::decode(bytes)?;
        Ok(Self::from_message(source, message))
    }

    pub fn from_message(source: impl Into<String>, message: proto::FeedMessage) -> Self {
        let timestamp = message
            .header
            .as_ref()
            .and_then(|h| h.timestamp)
            .and_then(|t| i64::try_from(t).ok());

        let trip_updates = message
            .entity
            .into_iter()
            .filter(|e| !e.is_deleted.unwrap_or(false))
            .filter_map(|e| e.trip_update)
            .map(TripUpdate::from)
            .collect();

        Self {
            source: source.into(),
            timestamp,
            trip_updates,
        }
    }
}

/// Live progress of one trip.
#[derive(Debug, Clone, PartialEq)]
pub struct TripUpdate {
    pub trip_id: String,
    pub route_id: String,
    /// Carried through but not used when merging departures.
    pub schedule_relationship: TripScheduleRelationship,
    /// In the order the feed lists them.
    pub stop_time_updates: Vec<StopTimeUpdate>,
}

impl TripUpdate {
    /// The stop this trip currently terminates at.
    pub fn final_stop(&self) -> Option<&StopTimeUpdate> {
        self.stop_time_updates.last()
    }
}

impl From<proto::TripUpdate> for TripUpdate {
    fn from(update: proto::TripUpdate) -> Self {
        let (trip_id, route_id, schedule_relationship) = match update.trip {
            Some(trip) => {
                let relationship = trip.schedule_relationship();
                (
                    trip.trip_id.unwrap_or_default(),
                    trip.route_id.unwrap_or_default(),
                    relationship,
                )
            }
            None => (
                String::new(),
                String::new(),
                TripScheduleRelationship::Scheduled,
            ),
        };

        Self {
            trip_id,
            route_id,
            schedule_relationship,
            stop_time_updates: update
                .stop_time_update
                .into_iter()
                .map(StopTimeUpdate::from)
                .collect(),
        }
    }
}

/// Predicted times at one stop, POSIX seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct StopTimeUpdate {
    pub stop_id: String,
    pub arrival: Option<i64>,
    pub departure: Option<i64>,
    pub schedule_relationship: StopScheduleRelationship,
}

impl StopTimeUpdate {
    /// When a rider can board: the departure prediction, else the arrival.
    pub fn boarding_time(&self) -> Option<i64> {
        self.departure.or(self.arrival)
    }
}

impl From<proto::StopTimeUpdate> for StopTimeUpdate {
    fn from(update: proto::StopTimeUpdate) -> Self {
        let schedule_relationship = update.schedule_relationship();
        Self {
            stop_id: update.stop_id.unwrap_or_default(),
            arrival: update.arrival.and_then(|e| e.time),
            departure: update.departure.and_then(|e| e.time),
            schedule_relationship,
        }
    }
}
