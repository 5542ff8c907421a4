use std::{collections::HashMap, sync::Arc, time::Duration};

use futures::{Stream, StreamExt, stream::BoxStream};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use super::{
    AssetResolver, DataSource, Handle, MediaSurface, MemoryBackend, PlayerError, SlotId,
    SurfaceBackend, SurfacePool, SyncEngine, SyncReport, SyncSubscription, ViewFactoryBinding,
    ViewRegistry,
    events::{EventBridge, VideoEventResult, event_stream},
    source::resolve_source,
    view::view_type,
};
use crate::{config::PlayerConfig, services::common::Property};

struct PlayerEntry {
    source: DataSource,
    master: Arc<dyn MediaSurface>,
    view_type: String,
    events: EventBridge,
    sync: Arc<SyncSubscription>,
}

/// Owns every live player and the proxy pool they share.
///
/// Each player is one master surface plus a named view factory handing out
/// proxies for secondary view slots. Cloning the registry yields another
/// reference to the same state.
///
/// Addressing a handle with no live player is a caller bug. It is still
/// reported as [`PlayerError::UnknownHandle`] and logged at `error` level
/// rather than aborting the process, so a stale asynchronous callback cannot
/// take the host down.
#[derive(Clone)]
pub struct PlayerRegistry {
    players: Arc<RwLock<HashMap<Handle, PlayerEntry>>>,
    handles: Property<Vec<Handle>>,
    pool: SurfacePool,
    engine: SyncEngine,
    views: ViewRegistry,
    backend: Arc<dyn SurfaceBackend>,
    assets: Arc<dyn AssetResolver>,
    config: PlayerConfig,
}

impl PlayerRegistry {
    /// Create an empty registry constructing surfaces through `backend`.
    pub fn new(
        backend: Arc<dyn SurfaceBackend>,
        assets: Arc<dyn AssetResolver>,
        config: PlayerConfig,
    ) -> Self {
        let pool = SurfacePool::new(Arc::clone(&backend), config.pooling);
        let engine = SyncEngine::new(pool.clone(), config.drift_threshold());

        Self {
            players: Arc::new(RwLock::new(HashMap::new())),
            handles: Property::new(Vec::new()),
            pool,
            engine,
            views: ViewRegistry::new(),
            backend,
            assets,
            config,
        }
    }

    /// Registry backed by headless in-memory surfaces.
    pub fn in_memory(config: PlayerConfig) -> (Self, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::default());
        let registry = Self::new(
            Arc::clone(&backend) as Arc<dyn SurfaceBackend>,
            Arc::clone(&backend) as Arc<dyn AssetResolver>,
            config,
        );
        (registry, backend)
    }

    /// Guarantee a clean slate before the first player is created.
    ///
    /// Safe to call again; any players left from an earlier initialization
    /// are disposed.
    #[instrument(skip(self))]
    pub async fn init(&self) {
        let disposed = self.dispose_all().await;
        if disposed > 0 {
            warn!(disposed, "players were still alive at initialization");
        }
    }

    /// Create a player for `source` and register its view factory.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::UnsupportedSource` for file and content-URI
    /// sources; no handle is allocated in that case.
    #[instrument(skip(self, source), fields(kind = %source.kind()))]
    pub async fn create(&self, source: DataSource) -> Result<Handle, PlayerError> {
        let url = resolve_source(&source, self.assets.as_ref())?;
        let handle = Handle::next();

        let master = self.backend.create_surface();
        master.set_muted(false);
        master.set_autoplay(false);
        master.set_source(&url);

        let events = EventBridge::attach(handle, master.as_ref(), self.config.event_capacity);
        let sync = Arc::new(self.engine.attach(handle, Arc::clone(&master)));
        master.load();

        let view_type = view_type(&self.config.view_type_prefix, handle);
        self.views
            .register(
                view_type.clone(),
                ViewFactoryBinding::new(handle, Arc::clone(&master), self.pool.clone()),
            )
            .await;

        self.players.write().await.insert(
            handle,
            PlayerEntry {
                source,
                master,
                view_type,
                events,
                sync,
            },
        );
        self.handles.update(|handles| handles.push(handle));

        info!(%handle, %url, "player created");
        Ok(handle)
    }

    /// Tear down a player: its proxies, its view factory and its master.
    ///
    /// Proxies are recycled or discarded according to the pooling strategy.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::UnknownHandle` if the player does not exist.
    #[instrument(skip(self))]
    pub async fn dispose(&self, handle: Handle) -> Result<(), PlayerError> {
        let Some(entry) = self.players.write().await.remove(&handle) else {
            return Err(self.unknown(handle));
        };
        self.handles
            .update(|handles| handles.retain(|live| *live != handle));

        let PlayerEntry {
            master,
            view_type,
            events,
            sync,
            ..
        } = entry;

        drop(events);
        drop(sync);
        self.views.unregister(&view_type).await;

        let detached = self.pool.detach_all(handle).await;
        master.pause();
        master.release();

        info!(%handle, detached, "player disposed");
        Ok(())
    }

    /// Dispose every live player. Returns how many were disposed.
    pub async fn dispose_all(&self) -> usize {
        let handles: Vec<Handle> = self.players.read().await.keys().copied().collect();
        let mut disposed = 0;

        for handle in handles {
            if self.dispose(handle).await.is_ok() {
                disposed += 1;
            }
        }
        disposed
    }

    /// Dispose every player and release pooled proxies.
    pub async fn shutdown(&self) {
        let disposed = self.dispose_all().await;
        let released = self.pool.drain_free().await;
        info!(disposed, released, "player registry shut down");
    }

    fn unknown(&self, handle: Handle) -> PlayerError {
        error!(%handle, "operation on unknown player");
        PlayerError::UnknownHandle(handle)
    }

    async fn master(&self, handle: Handle) -> Result<Arc<dyn MediaSurface>, PlayerError> {
        self.players
            .read()
            .await
            .get(&handle)
            .map(|entry| Arc::clone(&entry.master))
            .ok_or_else(|| self.unknown(handle))
    }

    /// The master surface of `handle`.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::UnknownHandle` if the player does not exist.
    pub async fn player(&self, handle: Handle) -> Result<Arc<dyn MediaSurface>, PlayerError> {
        self.master(handle).await
    }

    /// The data source `handle` was created from.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::UnknownHandle` if the player does not exist.
    pub async fn data_source(&self, handle: Handle) -> Result<DataSource, PlayerError> {
        self.players
            .read()
            .await
            .get(&handle)
            .map(|entry| entry.source.clone())
            .ok_or_else(|| self.unknown(handle))
    }

    /// Enable or disable looping on the master.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::UnknownHandle` if the player does not exist.
    pub async fn set_looping(&self, handle: Handle, looping: bool) -> Result<(), PlayerError> {
        self.master(handle).await?.set_looping(looping);
        Ok(())
    }

    /// Start the master.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::UnknownHandle` if the player does not exist and
    /// `PlayerError::Surface` if the surface refuses to play.
    #[instrument(skip(self))]
    pub async fn play(&self, handle: Handle) -> Result<(), PlayerError> {
        let master = self.master(handle).await?;
        master.play().await.map_err(|e| {
            warn!(%handle, "master refused to play: {e}");
            PlayerError::from(e)
        })
    }

    /// Pause the master.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::UnknownHandle` if the player does not exist.
    pub async fn pause(&self, handle: Handle) -> Result<(), PlayerError> {
        self.master(handle).await?.pause();
        Ok(())
    }

    /// Set the master's audio level.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::UnknownHandle` if the player does not exist.
    pub async fn set_volume(&self, handle: Handle, volume: f64) -> Result<(), PlayerError> {
        self.master(handle).await?.set_volume(volume);
        Ok(())
    }

    /// Set the master's playback rate.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::UnknownHandle` if the player does not exist.
    pub async fn set_playback_speed(&self, handle: Handle, speed: f64) -> Result<(), PlayerError> {
        self.master(handle).await?.set_playback_rate(speed);
        Ok(())
    }

    /// Move the master's playback position.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::UnknownHandle` if the player does not exist.
    pub async fn seek_to(&self, handle: Handle, position: Duration) -> Result<(), PlayerError> {
        self.master(handle).await?.set_current_position(position);
        Ok(())
    }

    /// The master's playback position.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::UnknownHandle` if the player does not exist.
    pub async fn position(&self, handle: Handle) -> Result<Duration, PlayerError> {
        Ok(self.master(handle).await?.current_position())
    }

    /// Accepted for interface parity; mixing with other applications' audio
    /// is not available.
    pub async fn set_mix_with_others(&self, mix: bool) {
        debug!(mix, "ignoring mix-with-others request");
    }

    /// Event stream of `handle`.
    ///
    /// Every call creates an independent subscriber. The stream ends when the
    /// player is disposed.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::UnknownHandle` if the player does not exist.
    pub async fn video_events(
        &self,
        handle: Handle,
    ) -> Result<BoxStream<'static, VideoEventResult>, PlayerError> {
        let rx = self
            .players
            .read()
            .await
            .get(&handle)
            .map(|entry| entry.events.subscribe())
            .ok_or_else(|| self.unknown(handle))?;
        Ok(event_stream(handle, rx).boxed())
    }

    /// Surface to mount in view `slot` of `handle`.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::UnknownHandle` if the player does not exist.
    pub async fn build_view(
        &self,
        handle: Handle,
        slot: SlotId,
    ) -> Result<Arc<dyn MediaSurface>, PlayerError> {
        let name = self.view_type(handle).await?;
        self.views.build(&name, slot).await
    }

    /// The host tore down view `slot` of `handle`.
    ///
    /// Returns whether a proxy was detached.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::UnknownHandle` if the player does not exist.
    pub async fn release_view(&self, handle: Handle, slot: SlotId) -> Result<bool, PlayerError> {
        let name = self.view_type(handle).await?;
        match self.views.lookup(&name).await {
            Some(binding) => Ok(binding.release(slot).await),
            None => Err(PlayerError::UnknownView(name)),
        }
    }

    /// Name of the view factory registered for `handle`.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::UnknownHandle` if the player does not exist.
    pub async fn view_type(&self, handle: Handle) -> Result<String, PlayerError> {
        self.players
            .read()
            .await
            .get(&handle)
            .map(|entry| entry.view_type.clone())
            .ok_or_else(|| self.unknown(handle))
    }

    /// Run a full synchronization pass for `handle` right now.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::UnknownHandle` if the player does not exist.
    pub async fn synchronize(&self, handle: Handle) -> Result<SyncReport, PlayerError> {
        let sync = self
            .players
            .read()
            .await
            .get(&handle)
            .map(|entry| Arc::clone(&entry.sync))
            .ok_or_else(|| self.unknown(handle))?;
        Ok(sync.synchronize().await)
    }

    /// Observable report of the latest sync pass of `handle`.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::UnknownHandle` if the player does not exist.
    pub async fn sync_report(&self, handle: Handle) -> Result<Property<SyncReport>, PlayerError> {
        self.players
            .read()
            .await
            .get(&handle)
            .map(|entry| entry.sync.report())
            .ok_or_else(|| self.unknown(handle))
    }

    /// Proxy surfaces mounted for `handle`, in mount order.
    pub async fn proxies(&self, handle: Handle) -> Vec<Arc<dyn MediaSurface>> {
        self.pool.mounted(handle).await
    }

    /// Live handles in creation order.
    pub fn handles(&self) -> Vec<Handle> {
        self.handles.get()
    }

    /// Stream of live handles, emitted on every create and dispose.
    pub fn handles_monitored(&self) -> impl Stream<Item = Vec<Handle>> + Send + use<> {
        self.handles.watch()
    }

    /// Whether `handle` refers to a live player.
    pub async fn contains(&self, handle: Handle) -> bool {
        self.players.read().await.contains_key(&handle)
    }

    /// Number of live players.
    pub async fn len(&self) -> usize {
        self.players.read().await.len()
    }

    /// Whether no player is alive.
    pub async fn is_empty(&self) -> bool {
        self.players.read().await.is_empty()
    }

    /// Shared proxy pool.
    pub fn pool(&self) -> &SurfacePool {
        &self.pool
    }

    /// Named view factories for the host UI.
    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    /// Active player configuration.
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }
}
