//! API module for HTTP endpoints
//!
//! This module exposes the published batches to the timeline UI.

pub mod http;
pub mod rest;
pub mod state;

pub use http::create_router;
pub use state::AppState;
