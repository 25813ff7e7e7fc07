//! Resource Cache Service
//!
//! The handle the rest of the application talks to. It owns the four
//! stores, the preload scheduler and, when enabled, the memory monitor.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheStatistics, CleanupReport, ResourceStores};
use crate::config::{CacheConfig, MIB};
use crate::error::{CacheError, Result};
use crate::models::{AudioHandle, Page, PathResolver, ResourceLoaders, TextDocument};
use crate::preload::PreloadScheduler;
use crate::tasks::{default_probe, spawn_memory_monitor, MemoryProbe};

/// Cloneable handle to one cache service.
#[derive(Clone)]
pub struct ResourceCache {
    inner: Arc<Inner>,
}

struct Inner {
    stores: Arc<ResourceStores>,
    scheduler: PreloadScheduler,
    monitor: Mutex<Option<JoinHandle<()>>>,
    probe: MemoryProbe,
}

impl ResourceCache {
    /// Creates the service with file-backed loaders and the real memory probe.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(config: CacheConfig, resolver: Arc<dyn PathResolver>) -> Result<Self> {
        Self::with_parts(config, resolver, ResourceLoaders::default(), default_probe())
    }

    /// Creates the service from explicit loaders and memory probe.
    pub fn with_parts(
        config: CacheConfig,
        resolver: Arc<dyn PathResolver>,
        loaders: ResourceLoaders,
        probe: MemoryProbe,
    ) -> Result<Self> {
        config.validate()?;
        let monitor_enabled = config.monitor_enabled;
        info!(
            max_entries = config.max_entries,
            expiry_secs = config.expiry.as_secs(),
            threshold_mb = config.memory_threshold / MIB,
            max_concurrent_preloads = config.max_concurrent_preloads,
            "Resource cache initialized"
        );

        let stores = Arc::new(ResourceStores::new(config.into_shared(), resolver, loaders));
        let monitor = if monitor_enabled {
            Some(spawn_memory_monitor(stores.clone(), probe.clone())?)
        } else {
            None
        };
        let scheduler = PreloadScheduler::start(stores.clone());

        Ok(Self {
            inner: Arc::new(Inner {
                stores,
                scheduler,
                monitor: Mutex::new(monitor),
                probe,
            }),
        })
    }

    pub fn stores(&self) -> &ResourceStores {
        &self.inner.stores
    }

    pub fn scheduler(&self) -> &PreloadScheduler {
        &self.inner.scheduler
    }

    // == Lookups ==
    pub fn cache_image(&self, path: impl AsRef<Path>) -> Option<Arc<DynamicImage>> {
        self.inner.stores.cache_image(path.as_ref())
    }

    pub fn cache_audio(&self, path: impl AsRef<Path>) -> Option<Arc<AudioHandle>> {
        self.inner.stores.cache_audio(path.as_ref())
    }

    pub fn cache_text(&self, path: impl AsRef<Path>) -> Option<Arc<TextDocument>> {
        self.inner.stores.cache_text(path.as_ref())
    }

    pub fn cache_page(&self, path: impl AsRef<Path>) -> Option<Arc<Page>> {
        self.inner.stores.cache_page(path.as_ref())
    }

    // == Preloading ==
    /// Warms `page` and queues its neighbours. See [`PreloadScheduler::preload_page`].
    pub fn preload_page(&self, page: &Page) {
        self.inner.scheduler.preload_page(page);
    }

    /// Resolves once every queued and running preload has finished.
    pub async fn wait_for_preloads(&self) {
        self.inner.scheduler.wait_idle().await;
    }

    // == Maintenance ==
    /// Clears and disposes every store. Safe to call repeatedly.
    pub fn clear_cache(&self) {
        let removed = self.inner.stores.clear_all();
        info!(removed, "Cache cleared");
    }

    /// Runs a full trim and expiry pass now.
    pub fn cleanup(&self) -> CleanupReport {
        self.inner.stores.cleanup()
    }

    // == Configuration ==
    /// Replaces the size limit, idle expiry and memory threshold (bytes).
    /// Nothing changes when any value is rejected.
    pub fn set_cache_configuration(
        &self,
        max_size: usize,
        ttl: Duration,
        memory_threshold: u64,
    ) -> Result<()> {
        self.update_config(|config| {
            config.max_entries = max_size;
            config.expiry = ttl;
            config.memory_threshold = memory_threshold;
        })?;
        info!(
            max_entries = max_size,
            expiry_secs = ttl.as_secs(),
            threshold_mb = memory_threshold / MIB,
            "Cache configuration updated"
        );
        Ok(())
    }

    /// Applies from the next admitted preload on.
    pub fn set_max_concurrent_preloads(&self, limit: usize) -> Result<()> {
        self.update_config(|config| config.max_concurrent_preloads = limit)?;
        info!(limit, "Preload concurrency updated");
        Ok(())
    }

    /// Copy of the configuration currently in effect.
    pub fn configuration(&self) -> CacheConfig {
        self.inner.stores.config()
    }

    fn update_config(&self, change: impl FnOnce(&mut CacheConfig)) -> Result<()> {
        let mut guard = self.inner.stores.shared_config().write();
        let mut candidate = guard.clone();
        change(&mut candidate);
        candidate.validate()?;
        *guard = candidate;
        Ok(())
    }

    // == Statistics ==
    /// Memory usage is `None` when the probe fails, e.g. on platforms
    /// without process memory sampling.
    pub fn get_statistics(&self) -> CacheStatistics {
        let memory = match (self.inner.probe)() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!(error = %e, "Memory usage unavailable for statistics");
                None
            }
        };
        self.inner.stores.statistics(memory)
    }

    /// Stops the memory monitor and the preload dispatcher. Cached entries
    /// stay until the last handle is dropped or [`clear_cache`](Self::clear_cache).
    pub fn shutdown(&self) {
        if let Some(monitor) = self.inner.monitor.lock().take() {
            monitor.abort();
        }
        self.inner.scheduler.shutdown();
        info!("Resource cache shut down");
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.get_mut().take() {
            monitor.abort();
        }
    }
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("stores", &self.inner.stores.statistics(None))
            .field("preloads_in_flight", &self.inner.scheduler.in_flight())
            .finish()
    }
}

/// Loads a page file from disk, for callers that only hold a path.
pub fn open_page(path: impl AsRef<Path>) -> Result<Page> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(CacheError::NotFound(path.display().to_string()));
    }
    Page::load(path)
}
