//! Web layer for the departure board.
//!
//! JSON endpoints over the latest schedule and realtime snapshots.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
