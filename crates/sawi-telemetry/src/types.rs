use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of readings retained per channel.
pub const DEFAULT_CAP: usize = 50;

/// One physical sensor type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    SoilMoisture,
    AirTemperature,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::SoilMoisture, Channel::AirTemperature];

    /// Tag used by the sensor backend in the `type` field.
    pub fn wire_tag(&self) -> &'static str {
        match self {
            Channel::SoilMoisture => "KELEMBAPAN_TANAH",
            Channel::AirTemperature => "SUHU_UDARA",
        }
    }

    /// `None` for tags this build does not display (not an error).
    pub fn from_wire_tag(tag: &str) -> Option<Self> {
        match tag.trim() {
            "KELEMBAPAN_TANAH" => Some(Channel::SoilMoisture),
            "SUHU_UDARA" => Some(Channel::AirTemperature),
            _ => None,
        }
    }

    /// Short path segment used by the HTTP API (`soil` / `air`).
    pub fn slug(&self) -> &'static str {
        match self {
            Channel::SoilMoisture => "soil",
            Channel::AirTemperature => "air",
        }
    }

    pub fn from_slug(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soil" | "soil_moisture" => Some(Channel::SoilMoisture),
            "air" | "air_temperature" => Some(Channel::AirTemperature),
            _ => None,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// One timestamped observation from a channel.
///
/// Field-wise equality is only meaningful for the snapshot dedup rule; two
/// equal readings delivered by the push feed are still two events.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub channel: Channel,
    pub value: f64,
    pub observed_at: DateTime<Utc>,
}

impl Reading {
    pub fn new(channel: Channel, value: f64, observed_at: DateTime<Utc>) -> Self {
        Self {
            channel,
            value,
            observed_at,
        }
    }
}

/// Lifecycle of a reconciler within one session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No snapshot merged yet. Live events are still accepted.
    Uninitialized,
    /// Snapshot merged.
    Live,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Live => "live",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Maximum readings retained per channel.
    pub cap: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self { cap: DEFAULT_CAP }
    }
}

impl ReconcilerConfig {
    pub fn with_cap(cap: usize) -> Self {
        Self { cap }
    }
}
