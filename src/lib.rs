//! mirrorplay - one media player, many views.
//!
//! A single master surface decodes and plays; any number of secondary view
//! slots show silent proxy surfaces that are kept in step with it. Proxy
//! surfaces are pooled so slot churn does not keep allocating new ones.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mirrorplay::{config::PlayerConfig, services::mirror::{DataSource, PlayerRegistry, SlotId}};
//!
//! # async fn demo() -> Result<(), mirrorplay::services::PlayerError> {
//! let (registry, _backend) = PlayerRegistry::in_memory(PlayerConfig::default());
//! registry.init().await;
//!
//! let handle = registry.create(DataSource::network("https://example.com/a.mp4")).await?;
//! let _primary = registry.build_view(handle, SlotId::PRIMARY).await?;
//! let _thumbnail = registry.build_view(handle, SlotId(1)).await?;
//!
//! registry.play(handle).await?;
//! registry.dispose(handle).await?;
//! # Ok(())
//! # }
//! ```

/// Command-line interface.
pub mod cli;

/// Configuration schema and loading.
pub mod config;

/// Player registry, proxy pool and synchronization.
pub mod services;

/// Logging setup.
pub mod tracing_config;
