//! # skyhook-server
//!
//! HTTP server library for the skyhook field recovery tool.
//!
//! This library provides the API handlers, shared state, and logging setup
//! for the skyhook daemon.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod state;

pub use api::create_router;
pub use state::{AppState, SharedState};
