//! Telemetry session: one reconciler, one snapshot fetch, one push pump.
//!
//! The pump is the only consumer of the push queue and applies frames in
//! arrival order. The snapshot task runs once; its `hydrate` takes the same
//! write lock, so it lands between two frames, never inside one. A failed
//! fetch still hydrates (with nothing) so the session goes live on whatever
//! the push side delivered.

use std::sync::Arc;

use sawi_snapshot::SnapshotLoader;
use sawi_telemetry::{PushFrame, Reading, ReconcilerConfig, SeriesReconciler};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api_types::ReadingView;
use crate::state::{BusMsg, HydratedEvent};

pub struct Session;

/// Owner of the running session tasks.
pub struct SessionHandle {
    telemetry: Arc<RwLock<SeriesReconciler>>,
    pump: JoinHandle<()>,
    snapshot: JoinHandle<()>,
}

impl Session {
    /// Spawn the push pump and the snapshot task. Must be called inside a
    /// tokio runtime.
    pub fn start(
        cfg: ReconcilerConfig,
        loader: Arc<dyn SnapshotLoader>,
        feed_rx: mpsc::Receiver<PushFrame>,
        bus: broadcast::Sender<BusMsg>,
    ) -> SessionHandle {
        let telemetry = Arc::new(RwLock::new(SeriesReconciler::new(cfg)));
        info!(cap = cfg.cap, source = loader.source_name(), "session start");

        let pump = tokio::spawn(run_pump(Arc::clone(&telemetry), feed_rx, bus.clone()));
        let snapshot = tokio::spawn(run_snapshot(Arc::clone(&telemetry), loader, bus));

        SessionHandle {
            telemetry,
            pump,
            snapshot,
        }
    }
}

impl SessionHandle {
    pub fn telemetry(&self) -> Arc<RwLock<SeriesReconciler>> {
        Arc::clone(&self.telemetry)
    }

    /// Abort both tasks. Frames still queued are dropped with the receiver.
    pub fn shutdown(self) {
        self.pump.abort();
        self.snapshot.abort();
        info!("session shut down");
    }
}

// ---------------------------------------------------------------------------
// Push pump
// ---------------------------------------------------------------------------

async fn run_pump(
    telemetry: Arc<RwLock<SeriesReconciler>>,
    mut feed_rx: mpsc::Receiver<PushFrame>,
    bus: broadcast::Sender<BusMsg>,
) {
    while let Some(frame) = feed_rx.recv().await {
        let applied = {
            let mut rec = telemetry.write().await;
            apply_frame(&mut rec, frame)
        };
        for r in &applied {
            let _ = bus.send(BusMsg::Reading(ReadingView::from(r)));
        }
    }
    debug!("push queue closed; pump exiting");
}

/// Apply one frame and return the readings that were added to a series.
///
/// A batch is the server's recent list for a channel. It only fills gaps in
/// the series: known entries are skipped and the channel's latest value is
/// left as the last single push set it.
pub fn apply_frame(rec: &mut SeriesReconciler, frame: PushFrame) -> Vec<Reading> {
    match frame {
        PushFrame::Reading(r) => {
            rec.ingest(r.channel, r);
            vec![r]
        }
        PushFrame::Batch(channel, readings) => {
            let total = readings.len();
            let applied = rec.backfill(channel, readings);
            debug!(%channel, total, applied = applied.len(), "batch resync");
            applied
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot task
// ---------------------------------------------------------------------------

async fn run_snapshot(
    telemetry: Arc<RwLock<SeriesReconciler>>,
    loader: Arc<dyn SnapshotLoader>,
    bus: broadcast::Sender<BusMsg>,
) {
    let (soil, air, degraded) = match loader.load().await {
        Ok(snap) => {
            let (soil, air) = snap.into_parts();
            (soil, air, false)
        }
        Err(e) => {
            warn!(kind = e.kind(), error = %e, "snapshot fetch failed; continuing with live data only");
            let _ = bus.send(BusMsg::LogLine {
                level: "WARN".to_string(),
                msg: format!("snapshot unavailable: {e}"),
            });
            (Vec::new(), Vec::new(), true)
        }
    };

    let report = {
        let mut rec = telemetry.write().await;
        rec.hydrate(soil, air)
    };

    info!(
        degraded,
        soil_len = report.soil.len,
        air_len = report.air.len,
        deduplicated = report.soil.deduplicated + report.air.deduplicated,
        evicted = report.soil.evicted + report.air.evicted,
        "session hydrated"
    );

    let _ = bus.send(BusMsg::Hydrated(HydratedEvent {
        degraded,
        soil_len: report.soil.len,
        air_len: report.air.len,
        from_snapshot: report.soil.from_snapshot + report.air.from_snapshot,
    }));
}
