use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::{Handle, MasterSnapshot, MediaSurface, PlayerError, SlotId, SurfacePool};

/// Name under which the view factory of `handle` is registered.
pub fn view_type(prefix: &str, handle: Handle) -> String {
    format!("{prefix}-{handle}")
}

/// Supplies the surface for each view slot of one handle.
///
/// Slot 0 is the master itself. Every other slot gets a pooled proxy
/// mounted under the handle.
#[derive(Clone)]
pub struct ViewFactoryBinding {
    handle: Handle,
    master: Arc<dyn MediaSurface>,
    pool: SurfacePool,
}

impl ViewFactoryBinding {
    /// Bind `master` and `pool` for `handle`.
    pub fn new(handle: Handle, master: Arc<dyn MediaSurface>, pool: SurfacePool) -> Self {
        Self {
            handle,
            master,
            pool,
        }
    }

    /// Handle this factory serves.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Surface to mount in `slot`.
    ///
    /// Requesting a slot that already holds a proxy detaches that proxy
    /// first, so each slot owns at most one proxy.
    #[instrument(skip(self), fields(handle = %self.handle))]
    pub async fn build(&self, slot: SlotId) -> Arc<dyn MediaSurface> {
        if slot.is_primary() {
            return Arc::clone(&self.master);
        }

        if let Some(previous) = self.pool.proxy_for(self.handle, slot).await {
            debug!("slot requested again, remounting");
            self.pool.detach(self.handle, &previous).await;
        }

        let proxy = self.pool.acquire_proxy().await;
        let snapshot = MasterSnapshot::capture(self.master.as_ref());
        self.pool
            .mount(self.handle, slot, Arc::clone(&proxy), &snapshot)
            .await;
        proxy
    }

    /// Tear down the proxy of `slot`. The master slot is never torn down here.
    pub async fn release(&self, slot: SlotId) -> bool {
        if slot.is_primary() {
            return false;
        }

        match self.pool.proxy_for(self.handle, slot).await {
            Some(proxy) => self.pool.detach(self.handle, &proxy).await,
            None => false,
        }
    }
}

/// Named view factories, as seen by the host UI.
#[derive(Clone, Default)]
pub struct ViewRegistry {
    factories: Arc<RwLock<HashMap<String, ViewFactoryBinding>>>,
}

impl ViewRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn register(&self, name: String, binding: ViewFactoryBinding) {
        debug!(%name, "registering view factory");
        self.factories.write().await.insert(name, binding);
    }

    pub(crate) async fn unregister(&self, name: &str) -> Option<ViewFactoryBinding> {
        self.factories.write().await.remove(name)
    }

    /// Factory registered as `name`.
    pub async fn lookup(&self, name: &str) -> Option<ViewFactoryBinding> {
        self.factories.read().await.get(name).cloned()
    }

    /// Invoke the factory `name` for `slot`.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::UnknownView` if no factory has that name.
    pub async fn build(&self, name: &str, slot: SlotId) -> Result<Arc<dyn MediaSurface>, PlayerError> {
        let binding = self
            .lookup(name)
            .await
            .ok_or_else(|| PlayerError::UnknownView(name.to_string()))?;
        Ok(binding.build(slot).await)
    }

    /// Registered factory names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        config::PoolingStrategy,
        services::mirror::{MemoryBackend, MemorySurface, SurfaceBackend, surface::same_surface},
    };

    fn binding() -> (ViewFactoryBinding, SurfacePool) {
        let backend: Arc<dyn SurfaceBackend> = Arc::new(MemoryBackend::default());
        let pool = SurfacePool::new(backend, PoolingStrategy::Recycle);
        let master: Arc<dyn MediaSurface> = Arc::new(MemorySurface::new());
        master.set_source("https://example.com/v.mp4");
        (
            ViewFactoryBinding::new(Handle::next(), master, pool.clone()),
            pool,
        )
    }

    #[test]
    fn view_type_embeds_handle() {
        let handle = Handle::next();
        assert_eq!(
            view_type("videoPlayer", handle),
            format!("videoPlayer-{}", handle.value())
        );
    }

    #[tokio::test]
    async fn primary_slot_is_master() {
        let (binding, pool) = binding();

        let first = binding.build(SlotId::PRIMARY).await;
        let second = binding.build(SlotId::PRIMARY).await;

        assert!(same_surface(&first, &second));
        assert!(pool.mounted(binding.handle()).await.is_empty());
    }

    #[tokio::test]
    async fn distinct_slots_get_distinct_proxies() {
        let (binding, pool) = binding();
        let master = binding.build(SlotId::PRIMARY).await;

        let a = binding.build(SlotId(1)).await;
        let b = binding.build(SlotId(2)).await;

        assert!(!same_surface(&a, &b));
        assert!(!same_surface(&a, &master));
        assert_eq!(a.source(), "https://example.com/v.mp4");
        assert_eq!(pool.mounted(binding.handle()).await.len(), 2);
    }

    #[tokio::test]
    async fn repeated_slot_remounts() {
        let (binding, pool) = binding();

        let first = binding.build(SlotId(1)).await;
        let again = binding.build(SlotId(1)).await;

        assert!(same_surface(&first, &again));
        assert_eq!(pool.mounted(binding.handle()).await.len(), 1);
        assert_eq!(pool.free_len().await, 0);
    }

    #[tokio::test]
    async fn release_detaches_proxy() {
        let (binding, pool) = binding();
        let proxy = binding.build(SlotId(4)).await;

        assert!(binding.release(SlotId(4)).await);
        assert!(!binding.release(SlotId(4)).await);
        assert!(!binding.release(SlotId::PRIMARY).await);
        assert!(pool.is_free(&proxy).await);
    }

    #[tokio::test]
    async fn registry_rejects_unknown_names() {
        let views = ViewRegistry::new();

        let result = views.build("videoPlayer-0", SlotId(1)).await;

        assert!(matches!(result, Err(PlayerError::UnknownView(name)) if name == "videoPlayer-0"));
    }
}
