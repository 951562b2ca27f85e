//! Typed view of the effective configuration.
//!
//! Every section has defaults, so an empty config is valid. Unknown keys are
//! rejected: a typo must not silently fall back to a default.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::LoadedConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct SawiConfig {
    pub series: SeriesConfig,
    pub snapshot: SnapshotConfig,
    pub push: PushConfig,
    pub daemon: DaemonConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeriesConfig {
    /// Readings retained per channel.
    pub cap: usize,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self { cap: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SnapshotConfig {
    pub base_url: String,
    pub path: String,
    pub timeout_ms: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            path: "/sensor".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PushConfig {
    /// Websocket of the sensor backend. `None` = only `POST /v1/readings`.
    pub ws_url: Option<String>,
    pub reconnect_ms: u64,
    /// Bound of the frame queue between producers and the pump.
    pub queue_depth: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            ws_url: None,
            reconnect_ms: 2_000,
            queue_depth: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub bind_addr: String,
    pub heartbeat_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8899".to_string(),
            heartbeat_secs: 1,
        }
    }
}

impl SawiConfig {
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        Self::from_json(&loaded.config_json)
    }

    pub fn from_json(v: &Value) -> Result<Self> {
        let cfg: SawiConfig =
            serde_json::from_value(v.clone()).context("config does not match schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.series.cap == 0 {
            bail!("CONFIG_INVALID series.cap must be >= 1");
        }
        if self.snapshot.base_url.trim().is_empty() {
            bail!("CONFIG_INVALID snapshot.base_url must not be empty");
        }
        if self.push.queue_depth == 0 {
            bail!("CONFIG_INVALID push.queue_depth must be >= 1");
        }
        if self.daemon.heartbeat_secs == 0 {
            bail!("CONFIG_INVALID daemon.heartbeat_secs must be >= 1");
        }
        if let Some(url) = &self.push.ws_url {
            if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                bail!("CONFIG_INVALID push.ws_url must start with ws:// or wss://");
            }
        }
        Ok(())
    }
}
