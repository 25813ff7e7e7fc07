//! Cache Entry Module
//!
//! Wraps a loaded resource with creation and last-access timestamps.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A loaded resource plus access metadata.
///
/// The entry owns the resource until it is removed from its store. Callers
/// receive shared `Arc` handles.
#[derive(Debug)]
pub struct CacheEntry<T> {
    resource: Arc<T>,
    /// When the entry was inserted
    pub created_at: Instant,
    /// Updated on every successful lookup, never moves backwards
    pub last_access: Instant,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates an entry stamped with the current time.
    pub fn new(resource: T) -> Self {
        Self::at(resource, Instant::now())
    }

    /// Creates an entry stamped with the given time.
    pub fn at(resource: T, now: Instant) -> Self {
        Self {
            resource: Arc::new(resource),
            created_at: now,
            last_access: now,
        }
    }

    // == Resource ==
    /// Returns a shared handle to the resource.
    pub fn resource(&self) -> Arc<T> {
        Arc::clone(&self.resource)
    }

    // == Touch ==
    /// Records an access at `now`.
    pub fn touch(&mut self, now: Instant) {
        if now > self.last_access {
            self.last_access = now;
        }
    }

    /// Time since the last access.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_access)
    }

    // == Is Expired ==
    /// True when the entry has been idle strictly longer than `ttl`.
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        self.idle_for(now) > ttl
    }
}
