use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What happens to a proxy surface once its view slot goes away.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PoolingStrategy {
    /// Release detached proxies; every slot gets a newly constructed surface.
    None,

    /// Pause detached proxies and reuse them, most recently freed first.
    #[default]
    Recycle,
}

/// Player registry, pool and sync settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Proxy recycling policy.
    pub pooling: PoolingStrategy,

    /// Largest proxy drift, in milliseconds, tolerated before a corrective seek.
    pub drift_threshold_ms: u64,

    /// Prefix of view factory names; the handle is appended after a dash.
    pub view_type_prefix: String,

    /// Events buffered per player before slow subscribers start skipping.
    pub event_capacity: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            pooling: PoolingStrategy::Recycle,
            drift_threshold_ms: 100,
            view_type_prefix: String::from("videoPlayer"),
            event_capacity: 1024,
        }
    }
}

impl PlayerConfig {
    /// Drift threshold as a duration.
    pub fn drift_threshold(&self) -> Duration {
        Duration::from_millis(self.drift_threshold_ms)
    }
}
