use std::{sync::Arc, time::Duration};

use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tracing::{debug, instrument, trace, warn};

use super::{Handle, MediaSurface, SurfaceEvent, SurfacePool};
use crate::{config::PoolingStrategy, services::common::Property};

/// Outcome of the most recent synchronization pass of a handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Number of passes run so far, starting at 1
    pub pass: u64,
    /// Proxies whose position was corrected in this pass
    pub corrected: usize,
    /// Proxies started in this pass
    pub started: usize,
    /// Proxies paused in this pass
    pub paused: usize,
}

/// Mirrors master playback onto the proxies mounted in a [`SurfacePool`].
///
/// Reads the master, writes proxies. Positions are corrected only when a
/// proxy drifts past the threshold, so steady playback does not turn into a
/// stream of seeks.
#[derive(Clone)]
pub struct SyncEngine {
    pool: SurfacePool,
    drift_threshold: Duration,
    fold_play_state: bool,
}

impl SyncEngine {
    /// Create an engine for proxies of `pool`.
    ///
    /// Without pooling the play-state check also runs on every position
    /// update instead of only on start/stop transitions.
    pub fn new(pool: SurfacePool, drift_threshold: Duration) -> Self {
        let fold_play_state = pool.strategy() == PoolingStrategy::None;
        Self {
            pool,
            drift_threshold,
            fold_play_state,
        }
    }

    /// Subscribe to `master` and keep the proxies of `handle` in step with it
    /// until the returned subscription is dropped.
    pub fn attach(&self, handle: Handle, master: Arc<dyn MediaSurface>) -> SyncSubscription {
        let mut events = master.subscribe();
        let target = SyncTarget {
            engine: self.clone(),
            handle,
            master,
            report: Property::new(SyncReport::default()),
        };

        let runner = target.clone();
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => runner.on_event(&event).await,
                    Err(RecvError::Lagged(missed)) => {
                        warn!(handle = %runner.handle, missed, "sync lagged behind master events");
                        runner.full_pass().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!(handle = %runner.handle, "sync stopped");
        });

        SyncSubscription { target, task }
    }

    /// Seek every proxy of `handle` that drifted past the threshold.
    ///
    /// Returns how many proxies were moved.
    pub async fn correct_drift(&self, handle: Handle, master: &dyn MediaSurface) -> usize {
        let target = master.current_position();
        let mut corrected = 0;

        for proxy in self.pool.mounted(handle).await {
            let drift = proxy.current_position().abs_diff(target);
            if drift > self.drift_threshold {
                trace!(%handle, ?drift, "correcting proxy drift");
                proxy.set_current_position(target);
                corrected += 1;
            }
        }

        corrected
    }

    /// Match every proxy's paused flag to the master's.
    ///
    /// Returns `(started, paused)` counts; `started` leaves out proxies that
    /// refused right away. Starts are not awaited, so a proxy waiting on
    /// playback permission never holds back the others.
    pub async fn align_play_state(
        &self,
        handle: Handle,
        master: &dyn MediaSurface,
    ) -> (usize, usize) {
        let master_paused = master.is_paused();
        let (mut started, mut paused) = (0, 0);

        for entry in self.pool.entries(handle).await {
            match (master_paused, entry.surface.is_paused()) {
                (true, false) => {
                    entry.surface.pause();
                    paused += 1;
                }
                (false, true) => {
                    if self.pool.start(&entry).await {
                        started += 1;
                    }
                }
                _ => {}
            }
        }

        (started, paused)
    }
}

#[derive(Clone)]
struct SyncTarget {
    engine: SyncEngine,
    handle: Handle,
    master: Arc<dyn MediaSurface>,
    report: Property<SyncReport>,
}

impl SyncTarget {
    async fn on_event(&self, event: &SurfaceEvent) {
        match event {
            SurfaceEvent::TimeUpdate(_) => {
                let corrected = self
                    .engine
                    .correct_drift(self.handle, self.master.as_ref())
                    .await;
                let (started, paused) = if self.engine.fold_play_state {
                    self.engine
                        .align_play_state(self.handle, self.master.as_ref())
                        .await
                } else {
                    (0, 0)
                };
                self.record(corrected, started, paused);
            }
            SurfaceEvent::Started | SurfaceEvent::Stopped | SurfaceEvent::Ended => {
                let (started, paused) = self
                    .engine
                    .align_play_state(self.handle, self.master.as_ref())
                    .await;
                self.record(0, started, paused);
            }
            _ => {}
        }
    }

    #[instrument(skip(self), fields(handle = %self.handle))]
    async fn full_pass(&self) -> SyncReport {
        let corrected = self
            .engine
            .correct_drift(self.handle, self.master.as_ref())
            .await;
        let (started, paused) = self
            .engine
            .align_play_state(self.handle, self.master.as_ref())
            .await;
        self.record(corrected, started, paused)
    }

    fn record(&self, corrected: usize, started: usize, paused: usize) -> SyncReport {
        self.report.update(|report| {
            report.pass += 1;
            report.corrected = corrected;
            report.started = started;
            report.paused = paused;
        });
        self.report.get()
    }
}

/// Live synchronization of one handle. Dropping it stops the sync task.
pub struct SyncSubscription {
    target: SyncTarget,
    task: JoinHandle<()>,
}

impl SyncSubscription {
    /// Run one full pass now, independent of master events.
    pub async fn synchronize(&self) -> SyncReport {
        self.target.full_pass().await
    }

    /// Observable report of the latest pass.
    pub fn report(&self) -> Property<SyncReport> {
        self.target.report.clone()
    }
}

impl Drop for SyncSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::services::mirror::{
        MasterSnapshot, MemoryBackend, MemorySurface, SlotId, SurfaceBackend,
    };

    struct Fixture {
        pool: SurfacePool,
        engine: SyncEngine,
        master: Arc<MemorySurface>,
        handle: Handle,
    }

    fn fixture(strategy: PoolingStrategy) -> Fixture {
        let backend: Arc<dyn SurfaceBackend> = Arc::new(MemoryBackend::default());
        let pool = SurfacePool::new(backend, strategy);
        let engine = SyncEngine::new(pool.clone(), Duration::from_millis(100));
        Fixture {
            pool,
            engine,
            master: Arc::new(MemorySurface::new()),
            handle: Handle::next(),
        }
    }

    async fn mount(fixture: &Fixture, slot: u32) -> Arc<dyn MediaSurface> {
        let proxy = fixture.pool.acquire_proxy().await;
        let snapshot = MasterSnapshot::capture(fixture.master.as_ref());
        fixture
            .pool
            .mount(fixture.handle, SlotId(slot), Arc::clone(&proxy), &snapshot)
            .await;
        proxy
    }

    #[tokio::test]
    async fn small_drift_is_tolerated() {
        let f = fixture(PoolingStrategy::Recycle);
        let proxy = mount(&f, 1).await;
        f.master.set_current_position(Duration::from_millis(1050));
        proxy.set_current_position(Duration::from_millis(1000));

        let corrected = f.engine.correct_drift(f.handle, f.master.as_ref()).await;

        assert_eq!(corrected, 0);
        assert_eq!(proxy.current_position(), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn large_drift_is_corrected() {
        let f = fixture(PoolingStrategy::Recycle);
        let ahead = mount(&f, 1).await;
        let behind = mount(&f, 2).await;
        f.master.set_current_position(Duration::from_secs(10));
        ahead.set_current_position(Duration::from_millis(10_300));
        behind.set_current_position(Duration::from_millis(9_000));

        let corrected = f.engine.correct_drift(f.handle, f.master.as_ref()).await;

        assert_eq!(corrected, 2);
        assert_eq!(ahead.current_position(), Duration::from_secs(10));
        assert_eq!(behind.current_position(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn play_state_follows_master() {
        let f = fixture(PoolingStrategy::Recycle);
        let proxy = mount(&f, 1).await;

        f.master.play().await.unwrap();
        assert_eq!(
            f.engine.align_play_state(f.handle, f.master.as_ref()).await,
            (1, 0)
        );
        assert!(!proxy.is_paused());

        f.master.pause();
        assert_eq!(
            f.engine.align_play_state(f.handle, f.master.as_ref()).await,
            (0, 1)
        );
        assert!(proxy.is_paused());
    }

    #[tokio::test]
    async fn slow_proxy_start_does_not_hold_back_others() {
        let f = fixture(PoolingStrategy::Recycle);
        let slow = Arc::new(MemorySurface::new());
        slow.set_play_latency(Some(Duration::from_secs(5)));
        let slow: Arc<dyn MediaSurface> = slow;
        let snapshot = MasterSnapshot::capture(f.master.as_ref());
        f.pool
            .mount(f.handle, SlotId(1), Arc::clone(&slow), &snapshot)
            .await;
        let quick = mount(&f, 2).await;

        f.master.play().await.unwrap();
        let counts = tokio::time::timeout(
            Duration::from_millis(500),
            f.engine.align_play_state(f.handle, f.master.as_ref()),
        )
        .await
        .unwrap();

        assert_eq!(counts, (2, 0));
        assert!(!quick.is_paused());
        assert!(slow.is_paused());
        f.pool.detach_all(f.handle).await;
    }

    #[tokio::test]
    async fn subscription_reacts_to_master_events() {
        let f = fixture(PoolingStrategy::Recycle);
        let proxy = mount(&f, 1).await;
        let subscription = f
            .engine
            .attach(f.handle, Arc::clone(&f.master) as Arc<dyn MediaSurface>);
        let mut reports = Box::pin(subscription.report().watch());
        reports.next().await;

        f.master.play().await.unwrap();
        let report = reports.next().await.unwrap();

        assert_eq!(report.started, 1);
        assert!(!proxy.is_paused());
    }

    #[tokio::test]
    async fn folded_variant_aligns_on_position_updates() {
        let f = fixture(PoolingStrategy::None);
        let proxy = mount(&f, 1).await;
        let subscription = f
            .engine
            .attach(f.handle, Arc::clone(&f.master) as Arc<dyn MediaSurface>);
        let mut reports = Box::pin(subscription.report().watch());
        reports.next().await;

        f.master.play().await.unwrap();
        reports.next().await;
        proxy.pause();
        f.master.advance(Duration::from_millis(250));
        let report = reports.next().await.unwrap();

        assert_eq!(report.started, 1);
        assert!(!proxy.is_paused());
    }

    #[tokio::test]
    async fn explicit_pass_counts_up() {
        let f = fixture(PoolingStrategy::Recycle);
        mount(&f, 1).await;
        let subscription = f
            .engine
            .attach(f.handle, Arc::clone(&f.master) as Arc<dyn MediaSurface>);

        let first = subscription.synchronize().await;
        let second = subscription.synchronize().await;

        assert_eq!(second.pass, first.pass + 1);
    }
}
