//! Cache Statistics Module
//!
//! Process-lifetime hit/miss/eviction counters shared by every store, and the
//! snapshot value returned to collaborators.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Cache Counters ==
/// Running counters shared by the four stores.
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl CacheCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records entries removed by size-based trimming.
    pub fn record_evictions(&self, count: usize) {
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Records entries removed by idle expiry.
    pub fn record_expirations(&self, count: usize) {
        self.expirations.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }
}

// == Cache Statistics ==
/// Point-in-time view of the cache, regenerated on every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatistics {
    pub image_entries: usize,
    pub audio_entries: usize,
    pub text_entries: usize,
    pub page_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// Resident memory of the process, if it could be sampled
    pub memory_usage_bytes: Option<u64>,
    pub sampled_at: DateTime<Utc>,
}

impl CacheStatistics {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Entries across all four stores.
    pub fn total_entries(&self) -> usize {
        self.image_entries + self.audio_entries + self.text_entries + self.page_entries
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(hits: u64, misses: u64) -> CacheStatistics {
        CacheStatistics {
            image_entries: 1,
            audio_entries: 2,
            text_entries: 3,
            page_entries: 4,
            hits,
            misses,
            evictions: 0,
            expirations: 0,
            memory_usage_bytes: None,
            sampled_at: Utc::now(),
        }
    }

    #[test]
    fn test_counters_start_at_zero() {
        let counters = CacheCounters::new();
        assert_eq!(counters.hits(), 0);
        assert_eq!(counters.misses(), 0);
        assert_eq!(counters.evictions(), 0);
        assert_eq!(counters.expirations(), 0);
    }

    #[test]
    fn test_counters_accumulate() {
        let counters = CacheCounters::new();
        counters.record_hit();
        counters.record_hit();
        counters.record_miss();
        counters.record_evictions(3);
        counters.record_expirations(2);

        assert_eq!(counters.hits(), 2);
        assert_eq!(counters.misses(), 1);
        assert_eq!(counters.evictions(), 3);
        assert_eq!(counters.expirations(), 2);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(snapshot(0, 0).hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        assert_eq!(snapshot(3, 1).hit_rate(), 0.75);
    }

    #[test]
    fn test_total_entries() {
        assert_eq!(snapshot(0, 0).total_entries(), 10);
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_value(snapshot(1, 1)).unwrap();
        assert_eq!(json["page_entries"], 4);
        assert!(json["memory_usage_bytes"].is_null());
        assert!(json["sampled_at"].is_string());
    }
}
