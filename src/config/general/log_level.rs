use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Log verbosity, from failures only up to per-event tracing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Failures only.
    Error,

    /// Failures and refused operations such as blocked playback.
    Warn,

    /// Player lifecycle: creation, disposal, shutdown.
    #[default]
    Info,

    /// Pool traffic and slot mounting.
    Debug,

    /// Every native event and drift correction.
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}
