//! Resource Stores Module
//!
//! The four per-kind stores (image, audio, text, page record), sharing one
//! set of counters, one configuration and one path resolver.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use image::DynamicImage;
use tracing::{debug, info};

use crate::cache::{evict::Evictable, CacheCounters, CacheStatistics, CacheStore, ResourceKind};
use crate::config::{CacheConfig, SharedConfig};
use crate::models::{AudioHandle, Page, PathResolver, ResourceLoaders, TextDocument};

/// Entries removed by one cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub trimmed: usize,
    pub expired: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.trimmed + self.expired
    }
}

// == Resource Stores ==
pub struct ResourceStores {
    pub images: CacheStore<DynamicImage>,
    pub audio: CacheStore<AudioHandle>,
    pub text: CacheStore<TextDocument>,
    pub pages: CacheStore<Page>,
    counters: Arc<CacheCounters>,
    config: SharedConfig,
    resolver: Arc<dyn PathResolver>,
}

impl ResourceStores {
    pub fn new(
        config: SharedConfig,
        resolver: Arc<dyn PathResolver>,
        loaders: ResourceLoaders,
    ) -> Self {
        let counters = Arc::new(CacheCounters::new());
        Self {
            images: CacheStore::new(ResourceKind::Image, loaders.image, counters.clone()),
            audio: CacheStore::new(ResourceKind::Audio, loaders.audio, counters.clone())
                .with_disposer(loaders.audio_disposer),
            text: CacheStore::new(ResourceKind::Text, loaders.text, counters.clone()),
            pages: CacheStore::new(ResourceKind::Page, loaders.page, counters.clone()),
            counters,
            config,
            resolver,
        }
    }

    /// Copy of the current configuration.
    pub fn config(&self) -> CacheConfig {
        self.config.read().clone()
    }

    pub fn shared_config(&self) -> &SharedConfig {
        &self.config
    }

    pub fn resolver(&self) -> &dyn PathResolver {
        self.resolver.as_ref()
    }

    pub fn counters(&self) -> &CacheCounters {
        &self.counters
    }

    // == Typed Lookups ==
    pub fn cache_image(&self, path: &Path) -> Option<Arc<DynamicImage>> {
        self.lookup(&self.images, path)
    }

    pub fn cache_audio(&self, path: &Path) -> Option<Arc<AudioHandle>> {
        self.lookup(&self.audio, path)
    }

    pub fn cache_text(&self, path: &Path) -> Option<Arc<TextDocument>> {
        self.lookup(&self.text, path)
    }

    pub fn cache_page(&self, path: &Path) -> Option<Arc<Page>> {
        self.lookup(&self.pages, path)
    }

    /// Caches an already parsed page under its own path.
    pub fn cache_page_record(&self, page: &Page) -> Option<Arc<Page>> {
        self.pages.get_or_load_with(&page.key(), |_| Ok(page.clone()))
    }

    /// Empty paths and absent files are quiet misses: no load, no counters.
    fn lookup<T>(&self, store: &CacheStore<T>, path: &Path) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        if path.as_os_str().is_empty() || !self.resolver.exists(path) {
            debug!(kind = %store.kind(), path = %path.display(), "Resource missing, skipping");
            return None;
        }
        store.get_or_load(&path.to_string_lossy())
    }

    /// All four stores, for uniform sweeping.
    pub fn all(&self) -> [&dyn Evictable; 4] {
        [&self.images, &self.audio, &self.text, &self.pages]
    }

    // == Cleanup ==
    /// Memory-pressure cleanup: shrink every store to a quarter of the
    /// configured maximum, then drop entries idle past the expiry.
    pub fn cleanup(&self) -> CleanupReport {
        let config = self.config();
        let target = config.pressure_target();
        let mut report = CleanupReport::default();

        for store in self.all() {
            report.trimmed += store.trim_to(target);
            report.expired += store.remove_expired(config.expiry);
        }

        info!(
            trimmed = report.trimmed,
            expired = report.expired,
            target,
            "Cache cleanup complete"
        );
        report
    }

    /// Clears and disposes every store. Returns the number of entries removed.
    pub fn clear_all(&self) -> usize {
        self.all().iter().map(|store| store.clear()).sum()
    }

    // == Statistics ==
    pub fn statistics(&self, memory_usage_bytes: Option<u64>) -> CacheStatistics {
        CacheStatistics {
            image_entries: self.images.len(),
            audio_entries: self.audio.len(),
            text_entries: self.text.len(),
            page_entries: self.pages.len(),
            hits: self.counters.hits(),
            misses: self.counters.misses(),
            evictions: self.counters.evictions(),
            expirations: self.counters.expirations(),
            memory_usage_bytes,
            sampled_at: Utc::now(),
        }
    }
}
