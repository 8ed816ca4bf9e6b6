//! GTFS-realtime wire messages.
//!
//! Only the subset needed for trip updates. Fields not declared here
//! (vehicle positions, alerts, agency extensions) are skipped by the decoder.

/// Top-level feed payload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FeedMessage {
    #[prost(message, optional, tag = "1")]
    pub header: Option<FeedHeader>,

    #[prost(message, repeated, tag = "2")]
    pub entity: Vec<FeedEntity>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FeedHeader {
    #[prost(string, required, tag = "1")]
    pub gtfs_realtime_version: String,

    /// POSIX seconds when the feed was generated
    #[prost(uint64, optional, tag = "3")]
    pub timestamp: Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FeedEntity {
    #[prost(string, required, tag = "1")]
    pub id: String,

    #[prost(bool, optional, tag = "2")]
    pub is_deleted: Option<bool>,

    #[prost(message, optional, tag = "3")]
    pub trip_update: Option<TripUpdate>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TripUpdate {
    #[prost(message, optional, tag = "1")]
    pub trip: Option<TripDescriptor>,

    /// Ordered by stop sequence; the last entry is the trip's current
    /// final stop.
    #[prost(message, repeated, tag = "2")]
    pub stop_time_update: Vec<StopTimeUpdate>,

    #[prost(uint64, optional, tag = "4")]
    pub timestamp: Option<u64>,

    #[prost(int32, optional, tag = "5")]
    pub delay: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TripDescriptor {
    #[prost(string, optional, tag = "1")]
    pub trip_id: Option<String>,

    #[prost(string, optional, tag = "2")]
    pub start_time: Option<String>,

    #[prost(string, optional, tag = "3")]
    pub start_date: Option<String>,

    #[prost(enumeration = "TripScheduleRelationship", optional, tag = "4")]
    pub schedule_relationship: Option<i32>,

    #[prost(string, optional, tag = "5")]
    pub route_id: Option<String>,

    #[prost(uint32, optional, tag = "6")]
    pub direction_id: Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StopTimeUpdate {
    #[prost(uint32, optional, tag = "1")]
    pub stop_sequence: Option<u32>,

    #[prost(message, optional, tag = "2")]
    pub arrival: Option<StopTimeEvent>,

    #[prost(message, optional, tag = "3")]
    pub departure: Option<StopTimeEvent>,

    #[prost(string, optional, tag = "4")]
    pub stop_id: Option<String>,

    #[prost(enumeration = "StopScheduleRelationship", optional, tag = "5")]
    pub schedule_relationship: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StopTimeEvent {
    #[prost(int32, optional, tag = "1")]
    pub delay: Option<i32>,

    /// Absolute POSIX seconds
    #[prost(int64, optional, tag = "2")]
    pub time: Option<i64>,

    #[prost(int32, optional, tag = "3")]
    pub uncertainty: Option<i32>,
}

/// How a trip relates to the static timetable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TripScheduleRelationship {
    Scheduled = 0,
    Added = 1,
    Unscheduled = 2,
    Canceled = 3,
    Replacement = 5,
    Duplicated = 6,
    Deleted = 7,
}

/// How a single stop-time update relates to the static timetable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StopScheduleRelationship {
    Scheduled = 0,
    Skipped = 1,
    NoData = 2,
    Unscheduled = 3,
}
