use std::{fmt::Write, sync::Arc, time::Duration};

use clap::Args;
use tracing::info;

use super::{
    CliError,
    formatting::{format_check, format_field, format_header},
};
use crate::{
    config::Config,
    services::mirror::{
        DataSource, Handle, MediaSurface, MemorySurface, PlayerRegistry, Size, SlotId,
    },
};

/// Options of the `demo` command.
#[derive(Args, Debug, Clone)]
pub struct DemoOptions {
    /// Number of proxy view slots to mount
    #[arg(long, default_value_t = 3)]
    pub slots: u32,

    /// Number of clock ticks to simulate while playing
    #[arg(long, default_value_t = 5)]
    pub ticks: u32,

    /// Length of one tick in milliseconds
    #[arg(long, default_value_t = 250)]
    pub tick_ms: u64,

    /// Media URL of the player
    #[arg(long, default_value = "https://example.com/media/clip.mp4")]
    pub url: String,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            slots: 3,
            ticks: 5,
            tick_ms: 250,
            url: "https://example.com/media/clip.mp4".to_string(),
        }
    }
}

/// Simulate a player lifecycle on in-memory surfaces.
///
/// Proxies run slightly fast so drift builds up between ticks and the sync
/// pass has something to correct. Returns the report text.
///
/// # Errors
/// Returns `CliError::Player` if a player operation fails.
pub async fn run_demo(config: &Config, options: &DemoOptions) -> Result<String, CliError> {
    let (registry, backend) = PlayerRegistry::in_memory(config.player.clone());
    registry.init().await;

    let handle = registry.create(DataSource::network(&options.url)).await?;
    let created_before = backend.created().len();
    let clock = backend.last_created();
    if let Some(clock) = &clock {
        clock.finish_loading(Duration::from_secs(60), Size::new(1280, 720));
    }

    let mut out = String::new();
    writeln!(out, "{}", format_header("player"))?;
    writeln!(out, "{}", format_field("handle", handle))?;
    writeln!(
        out,
        "{}",
        format_field("source", registry.data_source(handle).await?.kind())
    )?;
    writeln!(out, "{}", format_field("view type", registry.view_type(handle).await?))?;

    registry.build_view(handle, SlotId::PRIMARY).await?;
    for slot in 1..=options.slots {
        registry.build_view(handle, SlotId(slot)).await?;
    }
    let proxies: Vec<Arc<MemorySurface>> = backend.created().split_off(created_before);
    writeln!(out, "{}", format_field("proxies", proxies.len()))?;

    registry.play(handle).await?;
    let master = registry.player(handle).await?;
    let tick = Duration::from_millis(options.tick_ms);

    writeln!(out, "{}", format_header("playing"))?;
    for _ in 0..options.ticks {
        for (index, proxy) in proxies.iter().enumerate() {
            proxy.advance(tick.mul_f64(1.0 + 0.25 * (index + 1) as f64));
        }
        if let Some(clock) = &clock {
            clock.advance(tick);
        }

        let report = registry.synchronize(handle).await?;
        let in_sync = in_sync(&registry, handle).await?;
        writeln!(
            out,
            "  pass {:>3}  position {:>7.3}s  corrected {}  {}",
            report.pass,
            master.current_position().as_secs_f64(),
            report.corrected,
            format_check(in_sync),
        )?;
    }

    registry.pause(handle).await?;
    let report = registry.synchronize(handle).await?;
    writeln!(out, "{}", format_header("paused"))?;
    writeln!(out, "{}", format_field("proxies paused", report.paused))?;
    writeln!(
        out,
        "{}",
        format_check(in_sync(&registry, handle).await?)
    )?;

    registry.dispose(handle).await?;
    writeln!(out, "{}", format_header("disposed"))?;
    writeln!(
        out,
        "{}",
        format_field("free list", registry.pool().free_len().await)
    )?;

    registry.shutdown().await;
    info!("demo finished");
    Ok(out)
}

async fn in_sync(registry: &PlayerRegistry, handle: Handle) -> Result<bool, CliError> {
    let master = registry.player(handle).await?;
    let threshold = registry.config().drift_threshold();

    Ok(registry.proxies(handle).await.iter().all(|proxy| {
        proxy.is_paused() == master.is_paused()
            && proxy.current_position().abs_diff(master.current_position()) <= threshold
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::PoolingStrategy;

    #[tokio::test]
    async fn demo_reports_every_pass() {
        let options = DemoOptions {
            ticks: 3,
            ..DemoOptions::default()
        };

        let report = run_demo(&Config::default(), &options).await.unwrap();

        assert!(report.contains("pass"));
        assert_eq!(report.matches("out of sync").count(), 0);
        assert!(report.contains("free list"));
    }

    #[tokio::test]
    async fn demo_runs_without_pooling() {
        let mut config = Config::default();
        config.player.pooling = PoolingStrategy::None;

        let report = run_demo(&config, &DemoOptions::default()).await.unwrap();

        assert!(report.contains("disposed"));
    }
}
