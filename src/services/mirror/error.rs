use super::{Handle, SourceKind};

/// Errors that can occur during player operations
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    /// The data source kind cannot be played on this platform
    #[error("{0} sources are not supported on this platform")]
    UnsupportedSource(SourceKind),

    /// No live player exists for the handle
    #[error("player {0} not found")]
    UnknownHandle(Handle),

    /// No view factory is registered under the name
    #[error("no view factory registered as '{0}'")]
    UnknownView(String),

    /// The master surface reported a playback failure
    #[error("playback failed ({code}): {message}")]
    Playback {
        /// Surface-specific error code
        code: String,
        /// Human readable description
        message: String,
    },

    /// A surface operation was rejected
    #[error("surface operation failed: {0}")]
    Surface(#[from] SurfaceError),
}

/// Failures reported by a media surface
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// Playback was refused by policy, e.g. autoplay restrictions
    #[error("not allowed: {0}")]
    NotAllowed(String),

    /// The media cannot be decoded
    #[error("not supported: {0}")]
    NotSupported(String),

    /// The pending operation was interrupted by a newer one
    #[error("operation aborted")]
    Aborted,

    /// Any other surface failure
    #[error("{0}")]
    Failed(String),
}
