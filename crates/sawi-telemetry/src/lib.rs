//! sawi-telemetry
//!
//! Live telemetry reconciliation engine for the two sawi sensor channels
//! (soil moisture, air temperature).
//!
//! Architectural decisions:
//! - One bulk snapshot per session merges with (never overwrites) live events
//! - Live events are inserted in timestamp order, not appended blindly
//! - Each channel series is bounded; oldest readings are evicted first
//! - "Latest" is arrival-ordered and kept apart from the series tail
//!
//! Deterministic, pure logic. No IO, no locking, no wall-clock. The session
//! owner feeds snapshot and push data in and reads derived views out.

mod engine;
mod format;
mod series;
mod types;
pub mod wire;

pub use engine::{HydrateReport, MergeOutcome, SeriesReconciler};
pub use format::{format_wib, month_name_id};
pub use series::ChannelSeries;
pub use types::*;
pub use wire::{decode_push_frame, PushFrame, WireError, WireReading};
