use std::{collections::HashMap, sync::Arc, time::Duration};

use futures::FutureExt;
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::{debug, instrument};

use super::{
    Handle, MediaSurface, Presentation, SlotId, SurfaceBackend, surface::same_surface,
};
use crate::config::PoolingStrategy;

/// A proxy surface mounted in one view slot of a handle.
#[derive(Clone)]
pub struct ProxyEntry {
    /// Handle the proxy mirrors
    pub handle: Handle,
    /// View slot the proxy was created for
    pub slot: SlotId,
    /// The proxy surface itself
    pub surface: Arc<dyn MediaSurface>,
    /// Mount counter value, distinguishing successive mounts of one surface
    pub generation: u64,
}

impl std::fmt::Debug for ProxyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyEntry")
            .field("handle", &self.handle)
            .field("slot", &self.slot)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Master state copied onto a proxy when it is mounted.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterSnapshot {
    /// Media URL
    pub source: String,
    /// Border and sizing hints
    pub presentation: Presentation,
    /// Native controls visibility
    pub controls_visible: bool,
    /// Looping flag
    pub looping: bool,
    /// Playback rate multiplier
    pub playback_rate: f64,
    /// Playback position
    pub position: Duration,
    /// Whether the master is paused
    pub paused: bool,
}

impl MasterSnapshot {
    /// Read the mirrored properties of `master`.
    pub fn capture(master: &dyn MediaSurface) -> Self {
        Self {
            source: master.source(),
            presentation: master.presentation(),
            controls_visible: master.controls_visible(),
            looping: master.is_looping(),
            playback_rate: master.playback_rate(),
            position: master.current_position(),
            paused: master.is_paused(),
        }
    }
}

#[derive(Default)]
struct PoolState {
    mounted: HashMap<Handle, Vec<ProxyEntry>>,
    free: Vec<Arc<dyn MediaSurface>>,
    pending: HashMap<u64, JoinHandle<()>>,
    next_generation: u64,
}

/// Mounted proxies per handle plus one free list shared by every handle.
///
/// With [`PoolingStrategy::Recycle`] detached proxies are paused and kept for
/// reuse, most recently freed first. With [`PoolingStrategy::None`] they are
/// released and every acquisition constructs a new surface.
#[derive(Clone)]
pub struct SurfacePool {
    state: Arc<RwLock<PoolState>>,
    backend: Arc<dyn SurfaceBackend>,
    strategy: PoolingStrategy,
}

impl SurfacePool {
    /// Create an empty pool constructing surfaces through `backend`.
    pub fn new(backend: Arc<dyn SurfaceBackend>, strategy: PoolingStrategy) -> Self {
        Self {
            state: Arc::new(RwLock::new(PoolState::default())),
            backend,
            strategy,
        }
    }

    /// Active pooling strategy.
    pub fn strategy(&self) -> PoolingStrategy {
        self.strategy
    }

    /// Take a proxy surface, reusing the most recently freed one if any.
    ///
    /// Fresh proxies are muted, silent and set to inline playback. The
    /// returned surface is not mounted anywhere.
    pub async fn acquire_proxy(&self) -> Arc<dyn MediaSurface> {
        if let Some(surface) = self.state.write().await.free.pop() {
            debug!("reusing pooled proxy surface");
            return surface;
        }

        let surface = self.backend.create_surface();
        surface.set_muted(true);
        surface.set_volume(0.0);
        surface.set_inline_playback(true);
        debug!("constructed new proxy surface");
        surface
    }

    /// Configure `surface` as a mirror of `master` and mount it under `handle`.
    ///
    /// If the master is playing the proxy is started as well. The start is
    /// not awaited past its first step; a refused start is logged and
    /// otherwise ignored.
    #[instrument(skip(self, surface, master), fields(handle = %handle, slot = %slot))]
    pub async fn mount(
        &self,
        handle: Handle,
        slot: SlotId,
        surface: Arc<dyn MediaSurface>,
        master: &MasterSnapshot,
    ) {
        surface.set_source(&master.source);
        surface.set_presentation(&master.presentation);
        surface.set_controls_visible(master.controls_visible);
        surface.set_looping(master.looping);
        surface.set_playback_rate(master.playback_rate);
        surface.set_current_position(master.position);
        surface.set_muted(true);
        surface.set_volume(0.0);

        let entry = {
            let mut state = self.state.write().await;
            state.free.retain(|free| !same_surface(free, &surface));
            state.next_generation += 1;
            let generation = state.next_generation;

            let entries = state.mounted.entry(handle).or_default();
            match entries
                .iter()
                .find(|entry| same_surface(&entry.surface, &surface))
            {
                Some(existing) => existing.clone(),
                None => {
                    let entry = ProxyEntry {
                        handle,
                        slot,
                        surface: Arc::clone(&surface),
                        generation,
                    };
                    entries.push(entry.clone());
                    entry
                }
            }
        };

        if master.paused {
            surface.pause();
        } else {
            self.start(&entry).await;
        }
    }

    /// Ask the proxy of `entry` to play without waiting for it to settle.
    ///
    /// A start that resolves immediately is handled inline. A pending one
    /// finishes in the background; if the proxy was detached or remounted in
    /// the meantime it is paused again, and detaching it cancels the start.
    ///
    /// Returns `false` if the proxy refused to start right away.
    pub async fn start(&self, entry: &ProxyEntry) -> bool {
        let surface = Arc::clone(&entry.surface);
        let mut play = Box::pin(async move { surface.play().await });

        match (&mut play).now_or_never() {
            Some(Ok(())) => true,
            Some(Err(e)) => {
                debug!(handle = %entry.handle, "proxy refused to start: {e}");
                false
            }
            None => {
                let mut state = self.state.write().await;
                let pool = self.clone();
                let pending = entry.clone();
                let task = tokio::spawn(async move {
                    if let Err(e) = play.await {
                        debug!(handle = %pending.handle, "proxy refused to start: {e}");
                    }
                    pool.settle_start(&pending).await;
                });
                state.pending.insert(entry.generation, task);
                true
            }
        }
    }

    async fn settle_start(&self, entry: &ProxyEntry) {
        let still_mounted = {
            let mut state = self.state.write().await;
            state.pending.remove(&entry.generation);
            state.mounted.get(&entry.handle).is_some_and(|entries| {
                entries
                    .iter()
                    .any(|mounted| mounted.generation == entry.generation)
            })
        };

        if !still_mounted {
            debug!(handle = %entry.handle, slot = %entry.slot, "proxy detached while starting");
            entry.surface.pause();
        }
    }

    /// Unmount `surface` from `handle`.
    ///
    /// Returns `false` without side effects when the surface is not mounted
    /// under `handle`.
    pub async fn detach(&self, handle: Handle, surface: &Arc<dyn MediaSurface>) -> bool {
        let entry = {
            let mut state = self.state.write().await;
            let Some(entries) = state.mounted.get_mut(&handle) else {
                return false;
            };
            let Some(index) = entries
                .iter()
                .position(|entry| same_surface(&entry.surface, surface))
            else {
                return false;
            };

            let entry = entries.remove(index);
            if entries.is_empty() {
                state.mounted.remove(&handle);
            }
            entry
        };

        self.retire(entry).await;
        true
    }

    /// Unmount every proxy of `handle` in mount order.
    ///
    /// Returns how many proxies were detached.
    pub async fn detach_all(&self, handle: Handle) -> usize {
        let entries = self
            .state
            .write()
            .await
            .mounted
            .remove(&handle)
            .unwrap_or_default();

        let count = entries.len();
        for entry in entries {
            self.retire(entry).await;
        }
        count
    }

    async fn retire(&self, entry: ProxyEntry) {
        if let Some(start) = self.state.write().await.pending.remove(&entry.generation) {
            start.abort();
        }
        entry.surface.pause();

        match self.strategy {
            PoolingStrategy::Recycle => {
                debug!(handle = %entry.handle, slot = %entry.slot, "proxy returned to free list");
                self.state.write().await.free.push(entry.surface);
            }
            PoolingStrategy::None => {
                debug!(handle = %entry.handle, slot = %entry.slot, "proxy discarded");
                entry.surface.release();
            }
        }
    }

    /// Proxy surfaces mounted under `handle`, in mount order.
    pub async fn mounted(&self, handle: Handle) -> Vec<Arc<dyn MediaSurface>> {
        self.state
            .read()
            .await
            .mounted
            .get(&handle)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| Arc::clone(&entry.surface))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Mounted entries of `handle`, in mount order.
    pub async fn entries(&self, handle: Handle) -> Vec<ProxyEntry> {
        self.state
            .read()
            .await
            .mounted
            .get(&handle)
            .cloned()
            .unwrap_or_default()
    }

    /// The proxy currently mounted for `slot` of `handle`.
    pub async fn proxy_for(&self, handle: Handle, slot: SlotId) -> Option<Arc<dyn MediaSurface>> {
        self.state
            .read()
            .await
            .mounted
            .get(&handle)?
            .iter()
            .find(|entry| entry.slot == slot)
            .map(|entry| Arc::clone(&entry.surface))
    }

    /// Whether `surface` is waiting in the free list.
    pub async fn is_free(&self, surface: &Arc<dyn MediaSurface>) -> bool {
        self.state
            .read()
            .await
            .free
            .iter()
            .any(|free| same_surface(free, surface))
    }

    /// Number of detached proxies awaiting reuse.
    pub async fn free_len(&self) -> usize {
        self.state.read().await.free.len()
    }

    /// Release every pooled surface and empty the free list.
    pub async fn drain_free(&self) -> usize {
        let free = std::mem::take(&mut self.state.write().await.free);
        let count = free.len();
        for surface in free {
            surface.release();
        }
        count
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::mirror::{MemoryBackend, MemorySurface};

    fn pool(strategy: PoolingStrategy) -> (SurfacePool, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::default());
        let pool = SurfacePool::new(Arc::clone(&backend) as Arc<dyn SurfaceBackend>, strategy);
        (pool, backend)
    }

    fn snapshot(paused: bool) -> MasterSnapshot {
        MasterSnapshot {
            source: "https://example.com/a.mp4".into(),
            presentation: Presentation::default(),
            controls_visible: true,
            looping: true,
            playback_rate: 1.5,
            position: Duration::from_secs(4),
            paused,
        }
    }

    #[tokio::test]
    async fn fresh_proxies_are_silent_and_inline() {
        let (pool, backend) = pool(PoolingStrategy::Recycle);

        let proxy = pool.acquire_proxy().await;
        let created = backend.last_created().unwrap();

        assert!(proxy.is_muted());
        assert_eq!(proxy.volume(), 0.0);
        assert!(created.inline_playback());
    }

    #[tokio::test]
    async fn mount_copies_master_state() {
        let (pool, _) = pool(PoolingStrategy::Recycle);
        let handle = Handle::next();
        let proxy = pool.acquire_proxy().await;

        pool.mount(handle, SlotId(1), Arc::clone(&proxy), &snapshot(true))
            .await;

        assert_eq!(proxy.source(), "https://example.com/a.mp4");
        assert!(proxy.controls_visible());
        assert!(proxy.is_looping());
        assert_eq!(proxy.playback_rate(), 1.5);
        assert_eq!(proxy.current_position(), Duration::from_secs(4));
        assert!(proxy.is_paused());
        assert!(proxy.is_muted());
        assert_eq!(pool.mounted(handle).await.len(), 1);
    }

    #[tokio::test]
    async fn mount_starts_proxy_when_master_plays() {
        let (pool, _) = pool(PoolingStrategy::Recycle);
        let handle = Handle::next();
        let proxy = pool.acquire_proxy().await;

        pool.mount(handle, SlotId(1), Arc::clone(&proxy), &snapshot(false))
            .await;

        assert!(!proxy.is_paused());
    }

    #[tokio::test]
    async fn refused_proxy_start_is_swallowed() {
        let (pool, _) = pool(PoolingStrategy::Recycle);
        let handle = Handle::next();
        let memory = Arc::new(MemorySurface::new());
        memory.reject_play(Some(crate::services::mirror::SurfaceError::NotAllowed(
            "autoplay".into(),
        )));
        let proxy: Arc<dyn MediaSurface> = memory;

        pool.mount(handle, SlotId(2), Arc::clone(&proxy), &snapshot(false))
            .await;

        assert!(proxy.is_paused());
        assert_eq!(pool.mounted(handle).await.len(), 1);
    }

    #[tokio::test]
    async fn detached_proxy_is_reused_first() {
        let (pool, backend) = pool(PoolingStrategy::Recycle);
        let handle = Handle::next();
        let first = pool.acquire_proxy().await;
        let second = pool.acquire_proxy().await;
        pool.mount(handle, SlotId(1), Arc::clone(&first), &snapshot(false))
            .await;
        pool.mount(handle, SlotId(2), Arc::clone(&second), &snapshot(false))
            .await;

        assert!(pool.detach(handle, &first).await);
        assert!(pool.detach(handle, &second).await);
        assert!(first.is_paused());

        let reused = pool.acquire_proxy().await;
        assert!(same_surface(&reused, &second));
        assert_eq!(backend.created().len(), 2);
    }

    #[tokio::test]
    async fn detach_of_unmounted_surface_is_noop() {
        let (pool, _) = pool(PoolingStrategy::Recycle);
        let handle = Handle::next();
        let stray = pool.acquire_proxy().await;

        assert!(!pool.detach(handle, &stray).await);
        assert_eq!(pool.free_len().await, 0);
    }

    #[tokio::test]
    async fn detach_all_keeps_mount_order() {
        let (pool, _) = pool(PoolingStrategy::Recycle);
        let handle = Handle::next();
        let a = pool.acquire_proxy().await;
        let b = pool.acquire_proxy().await;
        pool.mount(handle, SlotId(1), Arc::clone(&a), &snapshot(true))
            .await;
        pool.mount(handle, SlotId(2), Arc::clone(&b), &snapshot(true))
            .await;

        assert_eq!(pool.detach_all(handle).await, 2);

        assert!(pool.mounted(handle).await.is_empty());
        assert!(same_surface(&pool.acquire_proxy().await, &b));
        assert!(same_surface(&pool.acquire_proxy().await, &a));
    }

    #[tokio::test]
    async fn non_pooled_strategy_discards_proxies() {
        let (pool, backend) = pool(PoolingStrategy::None);
        let handle = Handle::next();
        let proxy = pool.acquire_proxy().await;
        pool.mount(handle, SlotId(1), Arc::clone(&proxy), &snapshot(true))
            .await;

        assert!(pool.detach(handle, &proxy).await);

        assert_eq!(pool.free_len().await, 0);
        assert!(backend.created()[0].is_released());
        let next = pool.acquire_proxy().await;
        assert!(!same_surface(&next, &proxy));
    }

    #[tokio::test]
    async fn detaching_cancels_a_pending_start() {
        let (pool, _) = pool(PoolingStrategy::Recycle);
        let handle = Handle::next();
        let memory = Arc::new(MemorySurface::new());
        memory.set_play_latency(Some(Duration::from_millis(200)));
        let proxy: Arc<dyn MediaSurface> = memory.clone();

        pool.mount(handle, SlotId(1), Arc::clone(&proxy), &snapshot(false))
            .await;
        assert_eq!(memory.play_calls(), 1);
        assert!(pool.detach(handle, &proxy).await);
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(proxy.is_paused());
        assert!(pool.is_free(&proxy).await);
    }

    #[tokio::test]
    async fn pending_start_does_not_block_mount() {
        let (pool, _) = pool(PoolingStrategy::Recycle);
        let handle = Handle::next();
        let memory = Arc::new(MemorySurface::new());
        memory.set_play_latency(Some(Duration::from_secs(5)));
        let proxy: Arc<dyn MediaSurface> = memory;

        tokio::time::timeout(
            Duration::from_millis(500),
            pool.mount(handle, SlotId(1), Arc::clone(&proxy), &snapshot(false)),
        )
        .await
        .unwrap();

        assert_eq!(pool.entries(handle).await.len(), 1);
        assert!(pool.detach(handle, &proxy).await);
    }

    #[tokio::test]
    async fn mounting_twice_does_not_duplicate() {
        let (pool, _) = pool(PoolingStrategy::Recycle);
        let handle = Handle::next();
        let proxy = pool.acquire_proxy().await;

        pool.mount(handle, SlotId(1), Arc::clone(&proxy), &snapshot(true))
            .await;
        pool.mount(handle, SlotId(1), Arc::clone(&proxy), &snapshot(true))
            .await;

        assert_eq!(pool.mounted(handle).await.len(), 1);
    }
}
