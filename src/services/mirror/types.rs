use std::{
    fmt,
    ops::Range,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use serde::{Deserialize, Serialize};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of one logical player.
///
/// Handles come from a process-wide counter and are never reused, so a stale
/// callback holding a disposed handle resolves to "unknown" instead of
/// silently reaching a newer player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    pub(crate) fn next() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, as used in view factory names.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a host view slot. Slot 0 always shows the master surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u32);

impl SlotId {
    /// The slot that renders the master surface itself.
    pub const PRIMARY: SlotId = SlotId(0);

    /// Whether this slot is served by the master surface.
    pub fn is_primary(&self) -> bool {
        *self == Self::PRIMARY
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SlotId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Where a player's media comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Remote media, played from the URL as given
    Network {
        /// Media URL
        uri: String,
    },

    /// Media bundled with the host application
    Asset {
        /// Asset path relative to the bundle
        asset: String,
        /// Package the asset belongs to, if not the host itself
        package: Option<String>,
    },

    /// Local file; not playable on this platform
    File {
        /// File URI
        uri: String,
    },

    /// Content-provider URI; not playable on this platform
    ContentUri {
        /// Content URI
        uri: String,
    },
}

impl DataSource {
    /// Shorthand for a network source.
    pub fn network(uri: impl Into<String>) -> Self {
        Self::Network { uri: uri.into() }
    }

    /// Shorthand for an asset source.
    pub fn asset(asset: impl Into<String>, package: Option<&str>) -> Self {
        Self::Asset {
            asset: asset.into(),
            package: package.map(str::to_string),
        }
    }

    /// Kind of this source, for diagnostics.
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Network { .. } => SourceKind::Network,
            Self::Asset { .. } => SourceKind::Asset,
            Self::File { .. } => SourceKind::File,
            Self::ContentUri { .. } => SourceKind::ContentUri,
        }
    }
}

/// Discriminant of a [`DataSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Remote URL
    Network,
    /// Bundled asset
    Asset,
    /// Local file
    File,
    /// Content-provider URI
    ContentUri,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Network => write!(f, "network"),
            SourceKind::Asset => write!(f, "asset"),
            SourceKind::File => write!(f, "file"),
            SourceKind::ContentUri => write!(f, "content-uri"),
        }
    }
}

/// Pixel dimensions of a video frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Size {
    /// Create a size from width and height
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Buffered span of the media timeline
pub type BufferedRange = Range<Duration>;

/// Events published on a player's event stream
#[derive(Debug, Clone, PartialEq)]
pub enum VideoEvent {
    /// Metadata is known; emitted once per player
    Initialized {
        /// Natural duration of the media
        duration: Duration,
        /// Natural frame size
        size: Size,
    },

    /// Playback started
    Playing,

    /// Playback paused
    Paused,

    /// Playback reached the end of the media
    Completed,

    /// Buffered ranges changed
    BufferingUpdate(Vec<BufferedRange>),

    /// Playback stalled waiting for data
    BufferingStart,

    /// Enough data is buffered to play through
    BufferingEnd,

    /// Natural frame size changed
    SizeChanged(Size),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_never_reused() {
        let first = Handle::next();
        let second = Handle::next();

        assert_ne!(first, second);
        assert!(second.value() > first.value());
        assert!(first.value() > 0);
    }

    #[test]
    fn asset_shorthand_keeps_package() {
        let source = DataSource::asset("video.mp4", Some("my_pkg"));
        assert_eq!(
            source,
            DataSource::Asset {
                asset: "video.mp4".into(),
                package: Some("my_pkg".into()),
            }
        );
        assert_eq!(source.kind(), SourceKind::Asset);
    }

    #[test]
    fn primary_slot_is_zero() {
        assert!(SlotId(0).is_primary());
        assert!(!SlotId(3).is_primary());
    }
}
