//! Bounded, time-ordered reading buffer for a single channel.
//!
//! # Invariants
//!
//! - **Ascending**: readings are sorted by `observed_at`; equal timestamps
//!   keep arrival order.
//! - **Bounded**: after every mutation the owner trims to its cap by dropping
//!   from the head (oldest first).
//!
//! Mutation is `pub(crate)`: only [`crate::SeriesReconciler`] may change a
//! series. Callers outside the crate get read access or a copy.

use std::collections::VecDeque;

use crate::Reading;

#[derive(Clone, Debug, Default)]
pub struct ChannelSeries {
    readings: VecDeque<Reading>,
}

impl ChannelSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Newest reading by timestamp.
    pub fn tail(&self) -> Option<&Reading> {
        self.readings.back()
    }

    /// Oldest retained reading.
    pub fn head(&self) -> Option<&Reading> {
        self.readings.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> + '_ {
        self.readings.iter()
    }

    pub fn to_vec(&self) -> Vec<Reading> {
        self.readings.iter().copied().collect()
    }

    /// Exact field-wise membership (channel, timestamp, value).
    pub fn contains(&self, reading: &Reading) -> bool {
        self.readings.iter().any(|r| r == reading)
    }

    /// Insert after every reading with `observed_at <= reading.observed_at`,
    /// so ties land behind earlier arrivals. Returns the insert position.
    pub(crate) fn insert_ordered(&mut self, reading: Reading) -> usize {
        let idx = self
            .readings
            .partition_point(|r| r.observed_at <= reading.observed_at);
        self.readings.insert(idx, reading);
        idx
    }

    /// Replace the contents with an already sorted sequence.
    pub(crate) fn replace_sorted(&mut self, readings: Vec<Reading>) {
        debug_assert!(is_ascending(&readings), "replace_sorted requires ascending input");
        self.readings = readings.into();
    }

    /// Drop from the head until `len <= cap`. Returns how many were dropped.
    pub(crate) fn evict_to(&mut self, cap: usize) -> usize {
        let mut evicted = 0;
        while self.readings.len() > cap {
            self.readings.pop_front();
            evicted += 1;
        }
        evicted
    }
}

pub(crate) fn is_ascending(readings: &[Reading]) -> bool {
    readings
        .windows(2)
        .all(|w| w[0].observed_at <= w[1].observed_at)
}
