//! Cache Store Module
//!
//! Concurrent get-or-load storage for one resource kind.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::cache::{CacheCounters, CacheEntry};
use crate::error::Result;

/// Produces a resource from its absolute path.
pub type Loader<T> = Arc<dyn Fn(&Path) -> Result<T> + Send + Sync>;

/// Releases state held by a resource when it leaves the cache.
pub type Disposer<T> = Arc<dyn Fn(&T) -> Result<()> + Send + Sync>;

// == Resource Kind ==
/// The four resource kinds the cache holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Image,
    Audio,
    Text,
    Page,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Image => "image",
            ResourceKind::Audio => "audio",
            ResourceKind::Text => "text",
            ResourceKind::Page => "page",
        };
        f.write_str(name)
    }
}

// == Cache Store ==
/// Thread-safe map from absolute path to cached resource.
///
/// Lookups on different keys never block each other. Two concurrent misses
/// on the same key may both run the loader; the first insert wins and the
/// other copy is disposed.
pub struct CacheStore<T> {
    kind: ResourceKind,
    entries: DashMap<String, CacheEntry<T>>,
    loader: Loader<T>,
    disposer: Option<Disposer<T>>,
    counters: Arc<CacheCounters>,
}

impl<T> CacheStore<T>
where
    T: Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an empty store that loads with `loader` and reports to `counters`.
    pub fn new(kind: ResourceKind, loader: Loader<T>, counters: Arc<CacheCounters>) -> Self {
        Self {
            kind,
            entries: DashMap::new(),
            loader,
            disposer: None,
            counters,
        }
    }

    /// Sets the release function run once for every removed resource.
    pub fn with_disposer(mut self, disposer: Disposer<T>) -> Self {
        self.disposer = Some(disposer);
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    // == Get Or Load ==
    /// Returns the cached resource for `key`, loading it with the store's
    /// loader on a miss.
    pub fn get_or_load(&self, key: &str) -> Option<Arc<T>> {
        let loader = Arc::clone(&self.loader);
        self.get_or_load_with(key, |path| loader(path))
    }

    /// Returns the cached resource for `key`, loading it with `loader` on a miss.
    ///
    /// A hit refreshes the entry's last-access time. A failed load is logged
    /// and reported as `None`; nothing is inserted.
    pub fn get_or_load_with<F>(&self, key: &str, loader: F) -> Option<Arc<T>>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.touch(Instant::now());
            self.counters.record_hit();
            return Some(entry.resource());
        }

        self.counters.record_miss();

        // No map lock is held while loading
        let started = Instant::now();
        let loaded = match loader(Path::new(key)) {
            Ok(resource) => resource,
            Err(e) => {
                error!(kind = %self.kind, path = key, error = %e, "Failed to load resource");
                return None;
            }
        };
        debug!(
            kind = %self.kind,
            path = key,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Resource cached"
        );

        let now = Instant::now();
        let (resource, duplicate) = match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().touch(now);
                (existing.get().resource(), Some(loaded))
            }
            Entry::Vacant(slot) => {
                let entry = CacheEntry::at(loaded, now);
                let resource = entry.resource();
                slot.insert(entry);
                (resource, None)
            }
        };

        if let Some(duplicate) = duplicate {
            debug!(kind = %self.kind, path = key, "Concurrent load lost the insert race");
            self.dispose(key, &duplicate);
        }

        Some(resource)
    }

    // == Peek ==
    /// Returns the cached resource without touching it or the counters.
    pub fn peek(&self, key: &str) -> Option<Arc<T>> {
        self.entries.get(key).map(|entry| entry.resource())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Remove ==
    /// Removes the entry for `key`, disposing its resource.
    pub fn remove(&self, key: &str) -> Option<CacheEntry<T>> {
        let (key, entry) = self.entries.remove(key)?;
        self.dispose(&key, &entry.resource());
        Some(entry)
    }

    /// Removes the entry only if `predicate` still holds under the map lock.
    pub(crate) fn remove_if<P>(&self, key: &str, predicate: P) -> bool
    where
        P: FnOnce(&CacheEntry<T>) -> bool,
    {
        match self.entries.remove_if(key, |_, entry| predicate(entry)) {
            Some((key, entry)) => {
                self.dispose(&key, &entry.resource());
                true
            }
            None => false,
        }
    }

    // == Clear ==
    /// Removes and disposes every entry. Returns the number removed.
    pub fn clear(&self) -> usize {
        let keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.iter().filter(|key| self.remove(key).is_some()).count()
    }

    /// Key and last-access time of every live entry.
    pub(crate) fn access_snapshot(&self) -> Vec<(String, Instant)> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().last_access))
            .collect()
    }

    pub(crate) fn counters(&self) -> &CacheCounters {
        &self.counters
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn dispose(&self, key: &str, resource: &T) {
        if let Some(disposer) = &self.disposer {
            if let Err(e) = disposer(resource) {
                warn!(kind = %self.kind, path = key, error = %e, "Failed to dispose resource");
            }
        }
    }
}

impl<T> fmt::Debug for CacheStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("kind", &self.kind)
            .field("len", &self.entries.len())
            .field("has_disposer", &self.disposer.is_some())
            .finish()
    }
}
