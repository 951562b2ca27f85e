//! Snapshot boundary for the session's one-time bulk fetch.
//!
//! This module defines **only** the snapshot type, the error taxonomy and the
//! loader trait. Concrete transports live elsewhere in the crate.

use std::fmt;

use sawi_telemetry::Reading;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Historical readings partitioned by channel.
///
/// Each partition is sorted ascending by `observed_at` (stable) so it can be
/// handed to `SeriesReconciler::hydrate` as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub soil: Vec<Reading>,
    pub air: Vec<Reading>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.soil.is_empty() && self.air.is_empty()
    }

    pub fn len(&self) -> usize {
        self.soil.len() + self.air.len()
    }

    pub fn into_parts(self) -> (Vec<Reading>, Vec<Reading>) {
        (self.soil, self.air)
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a [`SnapshotLoader`] may return.
///
/// Both variants lead to the same policy at the call site: continue the
/// session with empty series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport failure or non-success response.
    Unavailable { status: Option<u16>, detail: String },
    /// The response body could not be decoded into readings.
    MalformedPayload(String),
}

impl FetchError {
    pub fn unavailable(detail: impl Into<String>) -> Self {
        FetchError::Unavailable {
            status: None,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Unavailable { .. } => "unavailable",
            FetchError::MalformedPayload(_) => "malformed_payload",
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Unavailable {
                status: Some(code),
                detail,
            } => write!(f, "snapshot unavailable status={code}: {detail}"),
            FetchError::Unavailable {
                status: None,
                detail,
            } => write!(f, "snapshot unavailable: {detail}"),
            FetchError::MalformedPayload(msg) => write!(f, "malformed snapshot payload: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

// ---------------------------------------------------------------------------
// Loader trait
// ---------------------------------------------------------------------------

/// One-shot historical source for a session.
///
/// Object-safe so the session can hold an `Arc<dyn SnapshotLoader>`.
#[async_trait::async_trait]
pub trait SnapshotLoader: Send + Sync {
    /// Short name for logs (e.g. `"http"`).
    fn source_name(&self) -> &'static str;

    /// Issue the bulk request and partition the result by channel.
    ///
    /// Never mutates shared state; the caller feeds the result onward.
    async fn load(&self) -> Result<Snapshot, FetchError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingLoader;

    #[async_trait::async_trait]
    impl SnapshotLoader for FailingLoader {
        fn source_name(&self) -> &'static str {
            "failing"
        }

        async fn load(&self) -> Result<Snapshot, FetchError> {
            Err(FetchError::MalformedPayload("nope".to_string()))
        }
    }

    #[test]
    fn fetch_error_display_with_status() {
        let err = FetchError::Unavailable {
            status: Some(503),
            detail: "service unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "snapshot unavailable status=503: service unavailable");
        assert_eq!(err.kind(), "unavailable");
    }

    #[test]
    fn fetch_error_display_transport() {
        let err = FetchError::unavailable("connection refused");
        assert_eq!(err.to_string(), "snapshot unavailable: connection refused");
    }

    #[test]
    fn fetch_error_display_malformed() {
        let err = FetchError::MalformedPayload("expected value at line 1".to_string());
        assert_eq!(
            err.to_string(),
            "malformed snapshot payload: expected value at line 1"
        );
        assert_eq!(err.kind(), "malformed_payload");
    }

    #[test]
    fn loader_is_object_safe_via_box() {
        let loader: Box<dyn SnapshotLoader> = Box::new(FailingLoader);
        assert_eq!(loader.source_name(), "failing");
    }

    #[test]
    fn empty_snapshot() {
        let s = Snapshot::default();
        assert!(s.is_empty());
        assert_eq!(s.len(), 0);
    }
}
