//! Request and response types for all sawi-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests.  No business logic lives here.

use chrono::SecondsFormat;
use sawi_telemetry::{format_wib, Reading};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Reading view (shared by every reading-bearing response and the SSE bus)
// ---------------------------------------------------------------------------

/// A reading as the API exposes it: raw RFC 3339 timestamp plus the WIB
/// display string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingView {
    /// "soil" | "air"
    pub channel: String,
    pub value: f64,
    pub observed_at: String,
    pub observed_at_display: String,
}

impl From<&Reading> for ReadingView {
    fn from(r: &Reading) -> Self {
        Self {
            channel: r.channel.slug().to_string(),
            value: r.value,
            observed_at: r.observed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            observed_at_display: format_wib(r.observed_at),
        }
    }
}

impl From<Reading> for ReadingView {
    fn from(r: Reading) -> Self {
        Self::from(&r)
    }
}

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// /v1/status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub daemon_uptime_secs: u64,
    /// "uninitialized" | "live"
    pub phase: String,
    pub cap: usize,
    pub soil_len: usize,
    pub air_len: usize,
}

// ---------------------------------------------------------------------------
// /v1/channels/{slug}/...
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentResponse {
    pub channel: String,
    pub phase: String,
    /// `None` until the channel has seen a push or a snapshot entry.
    pub current: Option<ReadingView>,
    /// true when `current` came from a push rather than the series tail.
    pub from_push: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesResponse {
    pub channel: String,
    pub cap: usize,
    pub len: usize,
    /// Ascending by `observed_at`.
    pub readings: Vec<ReadingView>,
}

// ---------------------------------------------------------------------------
// /v1/rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowsResponse {
    pub len: usize,
    /// Newest first, both channels.
    pub rows: Vec<ReadingView>,
}

// ---------------------------------------------------------------------------
// POST /v1/readings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    /// false when the frame was well-formed but names no known channel/event.
    pub accepted: bool,
    pub channel: Option<String>,
    /// Readings carried by the queued frame.
    pub readings: usize,
}

// ---------------------------------------------------------------------------
// Errors (400 / 404 / 503)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
