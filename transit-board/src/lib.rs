//! Transit departure board server.
//!
//! Keeps a static GTFS timetable and a set of GTFS-realtime feeds fresh in
//! the background, and answers: "when is the next train from this station,
//! and where is it going?"

pub mod board;
pub mod config;
pub mod departures;
pub mod domain;
pub mod format;
pub mod query;
pub mod realtime;
pub mod schedule;
pub mod store;
pub mod web;
