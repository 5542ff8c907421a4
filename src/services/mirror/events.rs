use std::sync::{Arc, Mutex, PoisonError};

use async_stream::stream;
use futures::Stream;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, warn};

use super::{Handle, MediaSurface, PlayerError, SurfaceEvent, VideoEvent};

/// Item carried on a player's event stream.
pub type VideoEventResult = Result<VideoEvent, PlayerError>;

#[derive(Debug, Default)]
struct Translator {
    initialized: bool,
    buffering: bool,
}

impl Translator {
    fn translate(&mut self, event: SurfaceEvent) -> Option<VideoEventResult> {
        let translated = match event {
            SurfaceEvent::MetadataLoaded { duration, size } => {
                if self.initialized {
                    return None;
                }
                self.initialized = true;
                VideoEvent::Initialized { duration, size }
            }
            SurfaceEvent::Started => VideoEvent::Playing,
            SurfaceEvent::Stopped => VideoEvent::Paused,
            SurfaceEvent::Ended => VideoEvent::Completed,
            SurfaceEvent::Progress(ranges) => VideoEvent::BufferingUpdate(ranges),
            SurfaceEvent::Waiting => {
                self.buffering = true;
                VideoEvent::BufferingStart
            }
            SurfaceEvent::CanPlayThrough => {
                if !self.buffering {
                    return None;
                }
                self.buffering = false;
                VideoEvent::BufferingEnd
            }
            SurfaceEvent::Resized(size) => VideoEvent::SizeChanged(size),
            SurfaceEvent::Failed { code, message } => {
                return Some(Err(PlayerError::Playback { code, message }));
            }
            SurfaceEvent::TimeUpdate(_) => return None,
        };

        Some(Ok(translated))
    }
}

/// Forwards a master surface's native events to a player's subscribers.
///
/// Dropping the bridge closes the forwarding sender under its lock, so no
/// event is delivered once the drop returns; subscriber streams then end.
pub(crate) struct EventBridge {
    tx: broadcast::Sender<VideoEventResult>,
    forward: Arc<Mutex<Option<broadcast::Sender<VideoEventResult>>>>,
    task: JoinHandle<()>,
}

impl EventBridge {
    pub(crate) fn attach(handle: Handle, master: &dyn MediaSurface, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        let mut native = master.subscribe();
        let forward = Arc::new(Mutex::new(Some(tx.clone())));
        let sender = Arc::clone(&forward);

        let task = tokio::spawn(async move {
            let mut translator = Translator::default();
            loop {
                match native.recv().await {
                    Ok(event) => {
                        let Some(item) = translator.translate(event) else {
                            continue;
                        };
                        let guard = sender.lock().unwrap_or_else(PoisonError::into_inner);
                        match guard.as_ref() {
                            Some(tx) => {
                                let _ = tx.send(item);
                            }
                            None => break,
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(%handle, missed, "event bridge lagged behind master events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!(%handle, "event bridge stopped");
        });

        Self { tx, forward, task }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<VideoEventResult> {
        self.tx.subscribe()
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        self.forward
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.task.abort();
    }
}

/// Turn a receiver into the public event stream of `handle`.
///
/// Subscribers that fall behind skip the missed events.
pub(crate) fn event_stream(
    handle: Handle,
    mut rx: broadcast::Receiver<VideoEventResult>,
) -> impl Stream<Item = VideoEventResult> + Send {
    stream! {
        loop {
            match rx.recv().await {
                Ok(item) => yield item,
                Err(RecvError::Lagged(missed)) => {
                    warn!(%handle, missed, "event subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::services::mirror::{MemorySurface, Size};

    #[tokio::test]
    async fn nothing_is_delivered_after_the_bridge_drops() {
        let master = MemorySurface::new();
        let bridge = EventBridge::attach(Handle::next(), &master, 16);
        let mut rx = bridge.subscribe();

        master.stall();
        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, Ok(VideoEvent::BufferingStart));

        drop(bridge);
        master.stall();

        assert!(matches!(rx.recv().await, Err(RecvError::Closed)));
    }

    #[test]
    fn metadata_initializes_once() {
        let mut translator = Translator::default();
        let loaded = SurfaceEvent::MetadataLoaded {
            duration: Duration::from_secs(30),
            size: Size::new(1920, 1080),
        };

        assert_eq!(
            translator.translate(loaded.clone()),
            Some(Ok(VideoEvent::Initialized {
                duration: Duration::from_secs(30),
                size: Size::new(1920, 1080),
            }))
        );
        assert_eq!(translator.translate(loaded), None);
    }

    #[test]
    fn buffering_end_requires_a_stall() {
        let mut translator = Translator::default();

        assert_eq!(translator.translate(SurfaceEvent::CanPlayThrough), None);
        assert_eq!(
            translator.translate(SurfaceEvent::Waiting),
            Some(Ok(VideoEvent::BufferingStart))
        );
        assert_eq!(
            translator.translate(SurfaceEvent::CanPlayThrough),
            Some(Ok(VideoEvent::BufferingEnd))
        );
    }

    #[test]
    fn transitions_map_to_player_events() {
        let mut translator = Translator::default();

        assert_eq!(
            translator.translate(SurfaceEvent::Started),
            Some(Ok(VideoEvent::Playing))
        );
        assert_eq!(
            translator.translate(SurfaceEvent::Stopped),
            Some(Ok(VideoEvent::Paused))
        );
        assert_eq!(
            translator.translate(SurfaceEvent::Ended),
            Some(Ok(VideoEvent::Completed))
        );
        assert_eq!(
            translator.translate(SurfaceEvent::TimeUpdate(Duration::from_secs(1))),
            None
        );
    }

    #[test]
    fn failures_become_stream_errors() {
        let mut translator = Translator::default();

        let item = translator.translate(SurfaceEvent::Failed {
            code: "MEDIA_ERR_DECODE".into(),
            message: "corrupt frame".into(),
        });

        assert_eq!(
            item,
            Some(Err(PlayerError::Playback {
                code: "MEDIA_ERR_DECODE".into(),
                message: "corrupt frame".into(),
            }))
        );
    }
}
