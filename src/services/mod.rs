/// Shared reactive building blocks
pub mod common;
/// Mirrored media players
pub mod mirror;

pub use mirror::{
    DataSource, Handle, MediaSurface, PlayerError, PlayerRegistry, SlotId, SyncReport, VideoEvent,
};
