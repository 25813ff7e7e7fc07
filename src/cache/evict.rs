//! Eviction Module
//!
//! Size-based least-recently-used trimming and idle expiry over a store.
//! Both are stateless; the memory monitor applies them to every store during
//! a cleanup pass.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::cache::{CacheStore, ResourceKind};

// == Trim ==
/// Removes the least recently used entries until at most `target` remain.
///
/// Entries are ordered by last-access time, ties broken by key so the
/// outcome is deterministic. An entry touched after the candidates were
/// chosen is kept, so passes repeat while lookups keep the store above
/// `target`. Stops early when a pass removes nothing. Returns the number of
/// entries removed.
pub fn trim<T>(store: &CacheStore<T>, target: usize) -> usize
where
    T: Send + Sync + 'static,
{
    let mut removed = 0;

    while store.len() > target {
        let mut candidates = store.access_snapshot();
        candidates.sort_by(|(ka, ta), (kb, tb)| ta.cmp(tb).then_with(|| ka.cmp(kb)));

        let excess = candidates.len().saturating_sub(target);
        let pass = candidates
            .into_iter()
            .take(excess)
            .filter(|(key, seen)| store.remove_if(key, |entry| entry.last_access <= *seen))
            .count();

        if pass == 0 {
            break;
        }
        removed += pass;
    }

    if removed > 0 {
        store.counters().record_evictions(removed);
        debug!(kind = %store.kind(), removed, target, "Trimmed cache store");
    }
    removed
}

// == Remove Expired ==
/// Removes every entry idle for longer than `ttl`. Returns the number removed.
pub fn remove_expired<T>(store: &CacheStore<T>, ttl: Duration) -> usize
where
    T: Send + Sync + 'static,
{
    remove_expired_at(store, ttl, Instant::now())
}

/// [`remove_expired`] evaluated at an explicit point in time.
pub fn remove_expired_at<T>(store: &CacheStore<T>, ttl: Duration, now: Instant) -> usize
where
    T: Send + Sync + 'static,
{
    let removed = store
        .access_snapshot()
        .into_iter()
        .filter(|(key, _)| store.remove_if(key, |entry| entry.is_expired(now, ttl)))
        .count();

    store.counters().record_expirations(removed);
    if removed > 0 {
        debug!(kind = %store.kind(), removed, "Expired idle cache entries");
    }
    removed
}

// == Evictable ==
/// Object-safe view of a store, so stores of different resource types can be
/// swept together.
pub trait Evictable: Send + Sync {
    fn kind(&self) -> ResourceKind;
    fn len(&self) -> usize;
    fn trim_to(&self, target: usize) -> usize;
    fn remove_expired(&self, ttl: Duration) -> usize;
    fn clear(&self) -> usize;
}

impl<T> Evictable for CacheStore<T>
where
    T: Send + Sync + 'static,
{
    fn kind(&self) -> ResourceKind {
        CacheStore::kind(self)
    }

    fn len(&self) -> usize {
        CacheStore::len(self)
    }

    fn trim_to(&self, target: usize) -> usize {
        trim(self, target)
    }

    fn remove_expired(&self, ttl: Duration) -> usize {
        remove_expired(self, ttl)
    }

    fn clear(&self) -> usize {
        CacheStore::clear(self)
    }
}
