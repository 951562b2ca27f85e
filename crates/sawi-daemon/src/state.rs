//! Shared runtime state for sawi-daemon.
//!
//! All types here are `Clone`-able (via `Arc` or copy). Handlers receive
//! `State<Arc<AppState>>` from Axum; this module owns nothing async itself
//! apart from the heartbeat task.

use std::sync::Arc;
use std::time::Duration;

use sawi_telemetry::{PushFrame, SeriesReconciler};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, RwLock};

use crate::api_types::ReadingView;

/// Capacity of the SSE broadcast bus.
pub const BUS_CAPACITY: usize = 1024;

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    /// One reading applied by the push pump.
    Reading(ReadingView),
    /// The session snapshot was merged.
    Hydrated(HydratedEvent),
    LogLine { level: String, msg: String },
}

impl BusMsg {
    /// SSE event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::Reading(_) => "reading",
            BusMsg::Hydrated(_) => "hydrated",
            BusMsg::LogLine { .. } => "log",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydratedEvent {
    /// true when the snapshot fetch failed and the session went live empty.
    pub degraded: bool,
    pub soil_len: usize,
    pub air_len: usize,
    /// Snapshot entries kept after dedup, both channels.
    pub from_snapshot: usize,
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    /// Static build metadata.
    pub build: BuildInfo,
    /// Reconciler owned by the session. Handlers only take the read lock.
    pub telemetry: Arc<RwLock<SeriesReconciler>>,
    /// Sender side of the push pump queue.
    pub feed: mpsc::Sender<PushFrame>,
}

impl AppState {
    pub fn new(
        bus: broadcast::Sender<BusMsg>,
        telemetry: Arc<RwLock<SeriesReconciler>>,
        feed: mpsc::Sender<PushFrame>,
    ) -> Self {
        Self {
            bus,
            build: BuildInfo {
                service: "sawi-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            telemetry,
            feed,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fresh SSE bus. The initial receiver is dropped; subscribers come later.
pub fn new_bus() -> broadcast::Sender<BusMsg> {
    let (bus, _rx) = broadcast::channel::<BusMsg>(BUS_CAPACITY);
    bus
}

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
