//! Channel partitioning for flat snapshot responses.
//!
//! Converts wire records into a [`Snapshot`]: every record goes to exactly
//! one channel by its `type`, unknown types are dropped, and each partition
//! is stable-sorted ascending by `observed_at`.
//!
//! It does **not** fetch anything and does **not** apply the series cap
//! (that is the reconciler's job).

use sawi_telemetry::{Channel, WireReading};
use tracing::debug;

use crate::provider::{FetchError, Snapshot};

/// Partition decoded wire records by channel.
///
/// A record on a recognized channel with an unparseable timestamp or a
/// non-numeric value fails the whole payload as
/// [`FetchError::MalformedPayload`].
pub fn partition(records: &[WireReading]) -> Result<Snapshot, FetchError> {
    let mut out = Snapshot::default();
    let mut skipped = 0usize;

    for (idx, rec) in records.iter().enumerate() {
        let decoded = rec
            .decode()
            .map_err(|e| FetchError::MalformedPayload(format!("record {idx}: {e}")))?;
        match decoded {
            Some(r) => match r.channel {
                Channel::SoilMoisture => out.soil.push(r),
                Channel::AirTemperature => out.air.push(r),
            },
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, "snapshot records on unrecognized channels excluded");
    }

    // Vec::sort_by is stable: equal timestamps keep source order.
    out.soil.sort_by(|a, b| a.observed_at.cmp(&b.observed_at));
    out.air.sort_by(|a, b| a.observed_at.cmp(&b.observed_at));
    Ok(out)
}
