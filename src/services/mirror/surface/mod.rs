//! Contract for the playable media primitive and its construction.
//!
//! A [`MediaSurface`] decodes and renders one stream. Surfaces are shared as
//! `Arc<dyn MediaSurface>`; two handles to the same surface compare equal by
//! pointer identity (see [`same_surface`]).

/// Headless surface backend
pub mod memory;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{BufferedRange, Size, SurfaceError};

pub use memory::{MemoryBackend, MemorySurface};

/// Native events emitted by a surface
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// Duration and natural size became known
    MetadataLoaded {
        /// Natural duration
        duration: Duration,
        /// Natural frame size
        size: Size,
    },

    /// Playback position advanced or was moved
    TimeUpdate(Duration),

    /// Surface transitioned from paused to playing
    Started,

    /// Surface transitioned from playing to paused
    Stopped,

    /// Playback reached the end of the media
    Ended,

    /// Buffered ranges changed
    Progress(Vec<BufferedRange>),

    /// Playback stalled waiting for data
    Waiting,

    /// Enough data is buffered to play to the end
    CanPlayThrough,

    /// Natural frame size changed
    Resized(Size),

    /// The media failed to load or decode
    Failed {
        /// Surface-specific error code
        code: String,
        /// Human readable description
        message: String,
    },
}

/// Length of a CSS-like presentation dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extent {
    /// Fill the slot
    #[default]
    Fill,

    /// Fixed size in pixels
    Pixels(u32),
}

/// Presentation hints copied from master to proxies
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Presentation {
    /// Border style, `None` for borderless
    pub border: Option<String>,
    /// Horizontal extent
    pub width: Extent,
    /// Vertical extent
    pub height: Extent,
}

/// A playable media surface.
///
/// Setters take `&self`; implementations keep their state behind interior
/// mutability so a surface can be shared between the registry, the pool and
/// the sync task.
#[async_trait]
pub trait MediaSurface: Send + Sync {
    /// Currently assigned media URL, empty when unset.
    fn source(&self) -> String;

    /// Assign the media URL.
    fn set_source(&self, url: &str);

    /// Begin loading the assigned source.
    fn load(&self);

    /// Current playback position.
    fn current_position(&self) -> Duration;

    /// Move the playback position.
    fn set_current_position(&self, position: Duration);

    /// Natural duration, once known.
    fn duration(&self) -> Option<Duration>;

    /// Whether the surface is paused.
    fn is_paused(&self) -> bool;

    /// Whether audio output is muted.
    fn is_muted(&self) -> bool;

    /// Mute or unmute audio output.
    fn set_muted(&self, muted: bool);

    /// Audio level in `0.0..=1.0`.
    fn volume(&self) -> f64;

    /// Set the audio level. Range handling is up to the surface.
    fn set_volume(&self, volume: f64);

    /// Playback rate multiplier.
    fn playback_rate(&self) -> f64;

    /// Set the playback rate multiplier.
    fn set_playback_rate(&self, rate: f64);

    /// Whether playback restarts at the end.
    fn is_looping(&self) -> bool;

    /// Enable or disable looping.
    fn set_looping(&self, looping: bool);

    /// Whether native controls are shown.
    fn controls_visible(&self) -> bool;

    /// Show or hide native controls.
    fn set_controls_visible(&self, visible: bool);

    /// Start playing as soon as the source is loaded.
    fn set_autoplay(&self, autoplay: bool);

    /// Play inside the slot instead of taking over the screen.
    fn set_inline_playback(&self, inline: bool);

    /// Current presentation hints.
    fn presentation(&self) -> Presentation;

    /// Replace the presentation hints.
    fn set_presentation(&self, presentation: &Presentation);

    /// Start playback. Resolves once the surface actually plays or refuses.
    async fn play(&self) -> Result<(), SurfaceError>;

    /// Pause playback.
    fn pause(&self);

    /// Drop the source and free decoder resources.
    fn release(&self);

    /// Subscribe to native events.
    fn subscribe(&self) -> broadcast::Receiver<SurfaceEvent>;
}

/// Constructs fresh surfaces.
pub trait SurfaceBackend: Send + Sync {
    /// Allocate a new, unconfigured surface.
    fn create_surface(&self) -> Arc<dyn MediaSurface>;
}

/// Maps bundled asset keys to playable URLs.
pub trait AssetResolver: Send + Sync {
    /// URL under which the asset `key` is served.
    fn asset_url(&self, key: &str) -> String;
}

/// Pointer identity of two shared surfaces.
pub fn same_surface(a: &Arc<dyn MediaSurface>, b: &Arc<dyn MediaSurface>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
