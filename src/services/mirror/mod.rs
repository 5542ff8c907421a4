//! One authoritative media surface mirrored into many view slots.
//!
//! A player owns a single master surface that decodes and plays. Secondary
//! view slots receive silent proxy surfaces from a shared pool; the sync
//! engine keeps them in step with the master's position and play state.

/// Player and surface error types
pub mod error;
/// Native event translation and the per-player event stream
pub mod events;
/// Proxy surface pool
pub mod pool;
/// Player registry and public operations
pub mod registry;
/// Data source resolution
pub mod source;
/// Media surface contract
pub mod surface;
/// Master-to-proxy synchronization
pub mod sync;
/// Identifiers, data sources and events
pub mod types;
/// View factories
pub mod view;

pub use error::*;
pub use events::VideoEventResult;
pub use pool::{MasterSnapshot, ProxyEntry, SurfacePool};
pub use registry::PlayerRegistry;
pub use source::resolve_source;
pub use surface::{
    AssetResolver, Extent, MediaSurface, MemoryBackend, MemorySurface, Presentation,
    SurfaceBackend, SurfaceEvent, same_surface,
};
pub use sync::{SyncEngine, SyncReport, SyncSubscription};
pub use types::*;
pub use view::{ViewFactoryBinding, ViewRegistry, view_type};
