//! sawi-snapshot
//!
//! One-time bulk snapshot of sensor history for a dashboard session.
//!
//! This crate owns the loader abstraction and the HTTP loader. It does
//! **not** touch reconciler state; callers hand the partitioned result to
//! `SeriesReconciler::hydrate`.

pub mod partition;
pub mod provider;

pub use partition::partition;
pub use provider::{FetchError, Snapshot, SnapshotLoader};

use std::time::Duration;

use sawi_telemetry::WireReading;
use serde::Deserialize;
use tracing::{debug, info};

/// Default request path of the sensor backend.
pub const DEFAULT_SENSOR_PATH: &str = "/sensor";

/// Loader backed by the sensor REST endpoint (`GET {base_url}/sensor`).
#[derive(Debug, Clone)]
pub struct HttpSnapshotLoader {
    http: reqwest::Client,
    base_url: String,
    path: String,
    timeout: Duration,
}

impl HttpSnapshotLoader {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::new_with_path(base_url, DEFAULT_SENSOR_PATH, Duration::from_secs(10))
    }

    pub fn new_with_path(
        base_url: impl Into<String>,
        path: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            path: path.into(),
            timeout,
        }
    }

    fn build_url(&self) -> String {
        let path = self.path.trim_start_matches('/');
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait::async_trait]
impl SnapshotLoader for HttpSnapshotLoader {
    fn source_name(&self) -> &'static str {
        "http"
    }

    async fn load(&self) -> Result<Snapshot, FetchError> {
        let url = self.build_url();
        debug!(%url, "snapshot request");

        let resp = self
            .http
            .get(&url)
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Unavailable {
                status: Some(status.as_u16()),
                detail: status
                    .canonical_reason()
                    .unwrap_or("non-success response")
                    .to_string(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::unavailable(format!("body read failed: {e}")))?;
        let records = decode_body(&body)?;
        let snap = partition(&records)?;

        info!(
            records = records.len(),
            soil = snap.soil.len(),
            air = snap.air.len(),
            "snapshot loaded"
        );
        Ok(snap)
    }
}

/// The backend wraps records as `{"data": [...]}`; a bare array is accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SensorResponse {
    Envelope { data: Vec<WireReading> },
    Bare(Vec<WireReading>),
}

fn decode_body(body: &str) -> Result<Vec<WireReading>, FetchError> {
    let parsed: SensorResponse =
        serde_json::from_str(body).map_err(|e| FetchError::MalformedPayload(e.to_string()))?;
    Ok(match parsed {
        SensorResponse::Envelope { data } => data,
        SensorResponse::Bare(data) => data,
    })
}

// -----------------
// Tests (no network)
// -----------------
