//! Cache Module
//!
//! Per-kind resource stores with least-recently-used trimming, idle expiry
//! and shared hit/miss statistics.

mod entry;
pub mod evict;
mod stats;
mod store;
mod stores;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use evict::{remove_expired, trim, Evictable};
pub use stats::{CacheCounters, CacheStatistics};
pub use store::{CacheStore, Disposer, Loader, ResourceKind};
pub use stores::{CleanupReport, ResourceStores};
