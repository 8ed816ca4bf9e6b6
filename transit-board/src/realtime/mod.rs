//! GTFS-realtime feeds.
//!
//! Trip updates are polled from several independent endpoints (NYCT
//! publishes one per line group) and aggregated into one list of
//! snapshots per round.

mod aggregate;
mod client;
mod error;
mod mock;
pub mod proto;
mod types;

pub use aggregate::{DEFAULT_FETCH_TIMEOUT, FeedAggregator, FeedEndpoint, FeedSource};
pub use client::{DEFAULT_MAX_PAYLOAD_BYTES, FeedClientConfig, HttpFeedSource, feed_name};
pub use error::{FeedError, FetchFailure};
pub use mock::FileFeedSource;
pub use types::{
    FeedSnapshot, StopScheduleRelationship, StopTimeUpdate, TripScheduleRelationship, TripUpdate,
};

#[cfg(test)]
pub(crate) use types::tests as fixtures;
