//! In-memory surfaces that keep a playback clock without decoding anything.
//!
//! Used by the `demo` command and by tests to drive the registry through
//! realistic event sequences.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::trace;

use super::{AssetResolver, MediaSurface, Presentation, SurfaceBackend, SurfaceEvent};
use crate::services::mirror::{BufferedRange, Size, SurfaceError};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug)]
struct SurfaceState {
    source: String,
    loading: bool,
    position: Duration,
    duration: Option<Duration>,
    paused: bool,
    muted: bool,
    volume: f64,
    rate: f64,
    looping: bool,
    controls: bool,
    autoplay: bool,
    inline: bool,
    presentation: Presentation,
    released: bool,
    play_rejection: Option<SurfaceError>,
    play_latency: Option<Duration>,
    play_calls: usize,
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self {
            source: String::new(),
            loading: false,
            position: Duration::ZERO,
            duration: None,
            paused: true,
            muted: false,
            volume: 1.0,
            rate: 1.0,
            looping: false,
            controls: false,
            autoplay: false,
            inline: false,
            presentation: Presentation::default(),
            released: false,
            play_rejection: None,
            play_latency: None,
            play_calls: 0,
        }
    }
}

/// Headless [`MediaSurface`] with a manually advanced clock
#[derive(Debug)]
pub struct MemorySurface {
    state: Mutex<SurfaceState>,
    events: broadcast::Sender<SurfaceEvent>,
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySurface {
    /// Create a paused surface with no source.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(SurfaceState::default()),
            events,
        }
    }

    fn state(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SurfaceEvent) {
        trace!(?event, "memory surface event");
        let _ = self.events.send(event);
    }

    /// Complete loading: publish metadata and report the media as playable.
    pub fn finish_loading(&self, duration: Duration, size: Size) {
        {
            let mut state = self.state();
            state.loading = false;
            state.duration = Some(duration);
        }
        self.emit(SurfaceEvent::MetadataLoaded { duration, size });
        self.emit(SurfaceEvent::CanPlayThrough);
    }

    /// Advance the clock by `elapsed` wall time if playing.
    ///
    /// Honors the playback rate, wraps when looping and stops at the end
    /// otherwise.
    pub fn advance(&self, elapsed: Duration) {
        let mut events = Vec::with_capacity(3);
        {
            let mut state = self.state();
            if state.paused {
                return;
            }

            let mut position = state.position + elapsed.mul_f64(state.rate.max(0.0));
            match state.duration {
                Some(total) if position >= total && state.looping && !total.is_zero() => {
                    position = Duration::from_nanos(
                        (position.as_nanos() % total.as_nanos()) as u64,
                    );
                    state.position = position;
                    events.push(SurfaceEvent::TimeUpdate(position));
                }
                Some(total) if position >= total => {
                    state.position = total;
                    state.paused = true;
                    events.push(SurfaceEvent::TimeUpdate(total));
                    events.push(SurfaceEvent::Stopped);
                    events.push(SurfaceEvent::Ended);
                }
                _ => {
                    state.position = position;
                    events.push(SurfaceEvent::TimeUpdate(position));
                }
            }
        }

        for event in events {
            self.emit(event);
        }
    }

    /// Make subsequent `play` calls fail with `error`, or succeed with `None`.
    pub fn reject_play(&self, error: Option<SurfaceError>) {
        self.state().play_rejection = error;
    }

    /// Delay `play` resolution, emulating a pending permission negotiation.
    pub fn set_play_latency(&self, latency: Option<Duration>) {
        self.state().play_latency = latency;
    }

    /// Publish a buffered-ranges update.
    pub fn report_progress(&self, ranges: Vec<BufferedRange>) {
        self.emit(SurfaceEvent::Progress(ranges));
    }

    /// Report a playback stall.
    pub fn stall(&self) {
        self.emit(SurfaceEvent::Waiting);
    }

    /// Report recovery from a stall.
    pub fn recover(&self) {
        self.emit(SurfaceEvent::CanPlayThrough);
    }

    /// Change the natural frame size.
    pub fn resize(&self, size: Size) {
        self.emit(SurfaceEvent::Resized(size));
    }

    /// Report a media failure.
    pub fn fail(&self, code: &str, message: &str) {
        self.emit(SurfaceEvent::Failed {
            code: code.to_string(),
            message: message.to_string(),
        });
    }

    /// Whether [`MediaSurface::load`] was called since the last release.
    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    /// Whether [`MediaSurface::release`] was called.
    pub fn is_released(&self) -> bool {
        self.state().released
    }

    /// Whether autoplay was requested.
    pub fn autoplay(&self) -> bool {
        self.state().autoplay
    }

    /// Whether inline playback is requested.
    pub fn inline_playback(&self) -> bool {
        self.state().inline
    }

    /// Number of `play` calls received.
    pub fn play_calls(&self) -> usize {
        self.state().play_calls
    }
}

#[async_trait]
impl MediaSurface for MemorySurface {
    fn source(&self) -> String {
        self.state().source.clone()
    }

    fn set_source(&self, url: &str) {
        let mut state = self.state();
        state.source = url.to_string();
        state.released = false;
    }

    fn load(&self) {
        self.state().loading = true;
    }

    fn current_position(&self) -> Duration {
        self.state().position
    }

    fn set_current_position(&self, position: Duration) {
        let position = {
            let mut state = self.state();
            state.position = match state.duration {
                Some(total) => position.min(total),
                None => position,
            };
            state.position
        };
        self.emit(SurfaceEvent::TimeUpdate(position));
    }

    fn duration(&self) -> Option<Duration> {
        self.state().duration
    }

    fn is_paused(&self) -> bool {
        self.state().paused
    }

    fn is_muted(&self) -> bool {
        self.state().muted
    }

    fn set_muted(&self, muted: bool) {
        self.state().muted = muted;
    }

    fn volume(&self) -> f64 {
        self.state().volume
    }

    fn set_volume(&self, volume: f64) {
        self.state().volume = volume.clamp(0.0, 1.0);
    }

    fn playback_rate(&self) -> f64 {
        self.state().rate
    }

    fn set_playback_rate(&self, rate: f64) {
        self.state().rate = rate;
    }

    fn is_looping(&self) -> bool {
        self.state().looping
    }

    fn set_looping(&self, looping: bool) {
        self.state().looping = looping;
    }

    fn controls_visible(&self) -> bool {
        self.state().controls
    }

    fn set_controls_visible(&self, visible: bool) {
        self.state().controls = visible;
    }

    fn set_autoplay(&self, autoplay: bool) {
        self.state().autoplay = autoplay;
    }

    fn set_inline_playback(&self, inline: bool) {
        self.state().inline = inline;
    }

    fn presentation(&self) -> Presentation {
        self.state().presentation.clone()
    }

    fn set_presentation(&self, presentation: &Presentation) {
        self.state().presentation = presentation.clone();
    }

    async fn play(&self) -> Result<(), SurfaceError> {
        let latency = {
            let mut state = self.state();
            state.play_calls += 1;
            state.play_latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let started = {
            let mut state = self.state();
            if let Some(error) = state.play_rejection.clone() {
                return Err(error);
            }
            if state.released {
                return Err(SurfaceError::Aborted);
            }
            let was_paused = state.paused;
            state.paused = false;
            was_paused
        };

        if started {
            self.emit(SurfaceEvent::Started);
        }
        Ok(())
    }

    fn pause(&self) {
        let stopped = {
            let mut state = self.state();
            let was_playing = !state.paused;
            state.paused = true;
            was_playing
        };

        if stopped {
            self.emit(SurfaceEvent::Stopped);
        }
    }

    fn release(&self) {
        let mut state = self.state();
        state.source.clear();
        state.loading = false;
        state.paused = true;
        state.position = Duration::ZERO;
        state.released = true;
    }

    fn subscribe(&self) -> broadcast::Receiver<SurfaceEvent> {
        self.events.subscribe()
    }
}

/// Backend producing [`MemorySurface`]s and serving assets from a base URL
#[derive(Debug)]
pub struct MemoryBackend {
    asset_base: String,
    created: Mutex<Vec<Arc<MemorySurface>>>,
    resolved: Mutex<Vec<String>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new("memory://bundle")
    }
}

impl MemoryBackend {
    /// Create a backend resolving assets under `asset_base`.
    pub fn new(asset_base: impl Into<String>) -> Self {
        Self {
            asset_base: asset_base.into(),
            created: Mutex::new(Vec::new()),
            resolved: Mutex::new(Vec::new()),
        }
    }

    /// Every surface constructed so far, oldest first.
    pub fn created(&self) -> Vec<Arc<MemorySurface>> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recently constructed surface.
    pub fn last_created(&self) -> Option<Arc<MemorySurface>> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Asset keys passed to [`AssetResolver::asset_url`], in call order.
    pub fn resolved_keys(&self) -> Vec<String> {
        self.resolved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SurfaceBackend for MemoryBackend {
    fn create_surface(&self) -> Arc<dyn MediaSurface> {
        let surface = Arc::new(MemorySurface::new());
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&surface));
        surface
    }
}

impl AssetResolver for MemoryBackend {
    fn asset_url(&self, key: &str) -> String {
        self.resolved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(key.to_string());
        format!("{}/assets/{key}", self.asset_base.trim_end_matches('/'))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn play_and_pause_emit_transitions() {
        let surface = MemorySurface::new();
        let mut events = surface.subscribe();

        surface.play().await.unwrap();
        surface.play().await.unwrap();
        surface.pause();

        assert_eq!(events.recv().await.unwrap(), SurfaceEvent::Started);
        assert_eq!(events.recv().await.unwrap(), SurfaceEvent::Stopped);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn rejected_play_stays_paused() {
        let surface = MemorySurface::new();
        surface.reject_play(Some(SurfaceError::NotAllowed("autoplay".into())));

        let result = surface.play().await;

        assert_eq!(result, Err(SurfaceError::NotAllowed("autoplay".into())));
        assert!(surface.is_paused());
    }

    #[tokio::test]
    async fn advance_stops_at_end_without_looping() {
        let surface = MemorySurface::new();
        surface.finish_loading(Duration::from_secs(2), Size::new(640, 360));
        surface.play().await.unwrap();

        surface.advance(Duration::from_secs(3));

        assert_eq!(surface.current_position(), Duration::from_secs(2));
        assert!(surface.is_paused());
    }

    #[tokio::test]
    async fn advance_wraps_when_looping() {
        let surface = MemorySurface::new();
        surface.finish_loading(Duration::from_secs(2), Size::new(640, 360));
        surface.set_looping(true);
        surface.play().await.unwrap();

        surface.advance(Duration::from_millis(2500));

        assert_eq!(surface.current_position(), Duration::from_millis(500));
        assert!(!surface.is_paused());
    }

    #[test]
    fn advance_respects_rate() {
        let surface = MemorySurface::new();
        surface.state().paused = false;
        surface.set_playback_rate(2.0);

        surface.advance(Duration::from_secs(1));

        assert_eq!(surface.current_position(), Duration::from_secs(2));
    }

    #[test]
    fn asset_urls_use_base() {
        let backend = MemoryBackend::new("https://cdn.test/");
        assert_eq!(
            backend.asset_url("clips/a.mp4"),
            "https://cdn.test/assets/clips/a.mp4"
        );
        assert_eq!(backend.resolved_keys(), vec!["clips/a.mp4".to_string()]);
    }
}
