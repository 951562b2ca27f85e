use tracing::warn;

use crate::series::ChannelSeries;
use crate::{Channel, Phase, Reading, ReconcilerConfig};

// ---------------------------------------------------------------------------
// Merge evidence
// ---------------------------------------------------------------------------

/// What a snapshot merge did to one channel. Informational only; callers log it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Snapshot readings offered after the snapshot itself was cut to `cap`.
    pub from_snapshot: usize,
    /// Readings dropped because the snapshot alone exceeded `cap`.
    pub snapshot_truncated: usize,
    /// Live readings that matched a snapshot entry exactly and were folded into it.
    pub deduplicated: usize,
    /// Live readings carried over into the merged series.
    pub kept_live: usize,
    /// Readings evicted from the head after the union exceeded `cap`.
    pub evicted: usize,
    /// Final series length.
    pub len: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HydrateReport {
    pub soil: MergeOutcome,
    pub air: MergeOutcome,
    /// `true` when `hydrate` had already run in this session.
    pub repeated: bool,
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
struct ChannelState {
    series: ChannelSeries,
    latest: Option<Reading>,
}

/// Owns both channel series and their latest pushed values.
///
/// All mutation goes through [`hydrate`](Self::hydrate),
/// [`ingest`](Self::ingest) and [`backfill`](Self::backfill). Reads hand out copies, never handles into the
/// live buffers.
#[derive(Clone, Debug)]
pub struct SeriesReconciler {
    cfg: ReconcilerConfig,
    phase: Phase,
    soil: ChannelState,
    air: ChannelState,
}

impl Default for SeriesReconciler {
    fn default() -> Self {
        Self::new(ReconcilerConfig::default())
    }
}

impl SeriesReconciler {
    pub fn new(cfg: ReconcilerConfig) -> Self {
        Self {
            cfg,
            phase: Phase::Uninitialized,
            soil: ChannelState::default(),
            air: ChannelState::default(),
        }
    }

    pub fn cap(&self) -> usize {
        self.cfg.cap
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn state(&self, channel: Channel) -> &ChannelState {
        match channel {
            Channel::SoilMoisture => &self.soil,
            Channel::AirTemperature => &self.air,
        }
    }

    fn state_mut(&mut self, channel: Channel) -> &mut ChannelState {
        match channel {
            Channel::SoilMoisture => &mut self.soil,
            Channel::AirTemperature => &mut self.air,
        }
    }

    /// Merge the session's bulk snapshot.
    ///
    /// Per channel the snapshot is stable-sorted ascending, cut to its newest
    /// `cap` entries and unioned with whatever live events were ingested
    /// before it arrived. A live reading identical to a snapshot reading
    /// (channel, timestamp, value) is folded into it. On equal timestamps the
    /// snapshot entries sort first. LatestValue is left alone.
    ///
    /// # Precondition
    /// Called once per session. A repeated call is logged and merged under the
    /// same rules; it does not reset anything.
    pub fn hydrate(&mut self, soil: Vec<Reading>, air: Vec<Reading>) -> HydrateReport {
        let repeated = self.phase == Phase::Live;
        if repeated {
            warn!("hydrate called on a live reconciler; merging without reset");
        }

        let cap = self.cfg.cap;
        let soil_outcome = merge_snapshot(&mut self.soil.series, soil, cap);
        let air_outcome = merge_snapshot(&mut self.air.series, air, cap);
        self.phase = Phase::Live;

        HydrateReport {
            soil: soil_outcome,
            air: air_outcome,
            repeated,
        }
    }

    /// Apply one push event. Infallible and synchronous.
    ///
    /// The reading becomes the channel's latest value regardless of its
    /// timestamp, is inserted at its sorted position in the series, and the
    /// oldest entries are evicted past `cap`. Behaves the same before and
    /// after `hydrate`.
    ///
    /// The reading's own channel decides the series; `channel` must agree.
    pub fn ingest(&mut self, channel: Channel, reading: Reading) {
        debug_assert_eq!(channel, reading.channel, "ingest routed to the wrong channel");
        let cap = self.cfg.cap;
        let st = self.state_mut(reading.channel);
        st.latest = Some(reading);
        st.series.insert_ordered(reading);
        st.series.evict_to(cap);
    }

    /// Fill gaps from a server-side list of recent readings.
    ///
    /// Entries already in the series (exact triple) are skipped, the rest are
    /// inserted at their sorted position and the head is evicted past `cap`.
    /// LatestValue is never touched: a list is history, not a live push.
    /// Returns the entries that were inserted, oldest first.
    pub fn backfill(&mut self, channel: Channel, mut readings: Vec<Reading>) -> Vec<Reading> {
        let cap = self.cfg.cap;
        readings.sort_by(|a, b| a.observed_at.cmp(&b.observed_at));
        let st = self.state_mut(channel);
        let mut inserted = Vec::with_capacity(readings.len());
        for r in readings {
            debug_assert_eq!(channel, r.channel, "backfill routed to the wrong channel");
            if st.series.contains(&r) {
                continue;
            }
            st.series.insert_ordered(r);
            inserted.push(r);
        }
        st.series.evict_to(cap);
        inserted
    }

    /// Headline value: latest pushed reading, else the newest series entry.
    pub fn current_value(&self, channel: Channel) -> Option<Reading> {
        let st = self.state(channel);
        st.latest.or_else(|| st.series.tail().copied())
    }

    /// Latest pushed reading only, without the series fallback.
    pub fn latest(&self, channel: Channel) -> Option<Reading> {
        self.state(channel).latest
    }

    /// Ascending copy of the channel series.
    pub fn series(&self, channel: Channel) -> Vec<Reading> {
        self.state(channel).series.to_vec()
    }

    pub fn len(&self, channel: Channel) -> usize {
        self.state(channel).series.len()
    }

    pub fn contains(&self, reading: &Reading) -> bool {
        self.state(reading.channel).series.contains(reading)
    }

    /// Both series, newest first. Equal timestamps keep per-channel order,
    /// soil before air.
    pub fn combined_rows(&self) -> Vec<Reading> {
        let mut rows: Vec<Reading> =
            Vec::with_capacity(self.soil.series.len() + self.air.series.len());
        rows.extend(self.soil.series.iter().copied());
        rows.extend(self.air.series.iter().copied());
        rows.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
        rows
    }
}

fn merge_snapshot(series: &mut ChannelSeries, mut snapshot: Vec<Reading>, cap: usize) -> MergeOutcome {
    let mut out = MergeOutcome::default();

    snapshot.sort_by(|a, b| a.observed_at.cmp(&b.observed_at));
    if snapshot.len() > cap {
        out.snapshot_truncated = snapshot.len() - cap;
        snapshot.drain(..out.snapshot_truncated);
    }
    out.from_snapshot = snapshot.len();

    // One live entry cancels at most one identical snapshot entry, so
    // duplicates inside a single source survive.
    let mut matched = vec![false; snapshot.len()];
    let mut live_only: Vec<Reading> = Vec::new();
    for live in series.iter() {
        let hit = snapshot
            .iter()
            .enumerate()
            .position(|(i, s)| !matched[i] && s == live);
        match hit {
            Some(i) => {
                matched[i] = true;
                out.deduplicated += 1;
            }
            None => live_only.push(*live),
        }
    }
    out.kept_live = live_only.len();

    let mut merged = snapshot;
    merged.extend(live_only);
    merged.sort_by(|a, b| a.observed_at.cmp(&b.observed_at));

    series.replace_sorted(merged);
    out.evicted = series.evict_to(cap);
    out.len = series.len();
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
