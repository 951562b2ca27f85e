//! sawi-daemon library target.
//!
//! Exposes the router, state, session and feed for integration tests.
//! The binary `main.rs` depends on this library target.

pub mod api_types;
pub mod feed;
pub mod routes;
pub mod session;
pub mod state;
