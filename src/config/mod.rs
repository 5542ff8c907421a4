//! Configuration schema for mirrorplay.
//!
//! Loaded from TOML; every field has a default so an empty or missing file
//! yields a working configuration.

mod error;
mod general;
mod loading;
mod paths;
mod player;

#[cfg(test)]
mod tests;

pub use error::{ConfigError, Result};
pub use general::{GeneralConfig, LogLevel};
pub use paths::ConfigPaths;
pub use player::{PlayerConfig, PoolingStrategy};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
pub struct Config {
    /// Process-wide settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Player registry, pool and sync settings.
    #[serde(default)]
    pub player: PlayerConfig,
}
