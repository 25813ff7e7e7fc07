//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the accounting, trim and expiry invariants over
//! arbitrary access sequences.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::evict::remove_expired_at;
use crate::cache::{trim, CacheCounters, CacheStore, Loader, ResourceKind};

// == Helpers ==
fn counting_store(calls: Arc<AtomicUsize>) -> CacheStore<String> {
    let loader: Loader<String> = Arc::new(move |path: &Path| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(path.display().to_string())
    });
    CacheStore::new(ResourceKind::Page, loader, Arc::new(CacheCounters::new()))
}

/// Runs `body` on a runtime whose clock only moves when advanced.
fn with_paused_clock<F>(body: F)
where
    F: std::future::Future<Output = ()>,
{
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
        .block_on(body);
}

// == Strategies ==
/// Key index plus the gap (ms) before the access.
fn access_strategy() -> impl Strategy<Value = Vec<(u8, u64)>> {
    prop::collection::vec((0u8..16, 0u64..5), 1..60)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // First lookup of a key misses and loads; later lookups hit without loading.
    #[test]
    fn prop_hit_miss_accounting(keys in prop::collection::vec(0u8..12, 1..80)) {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = counting_store(calls.clone());
        let mut seen = HashSet::new();
        let mut expected_hits = 0u64;

        for key in &keys {
            if !seen.insert(*key) {
                expected_hits += 1;
            }
            store.get_or_load(&format!("/k{}", key));
        }

        prop_assert_eq!(store.counters().hits(), expected_hits);
        prop_assert_eq!(store.counters().misses(), seen.len() as u64);
        prop_assert_eq!(calls.load(Ordering::SeqCst), seen.len());
        prop_assert_eq!(store.len(), seen.len());
    }

    // After trimming, at most `target` entries remain and every removed entry
    // was accessed no later than every retained one.
    #[test]
    fn prop_trim_keeps_most_recent(accesses in access_strategy(), target in 0usize..20) {
        with_paused_clock(async {
            let store = counting_store(Arc::new(AtomicUsize::new(0)));
            for (key, gap) in &accesses {
                tokio::time::advance(Duration::from_millis(*gap)).await;
                store.get_or_load(&format!("/k{}", key));
            }

            let before: HashMap<String, Instant> = store.access_snapshot().into_iter().collect();
            let original = before.len();
            let removed = trim(&store, target);

            assert_eq!(store.len(), original.min(target));
            assert_eq!(removed, original - store.len());

            let retained: HashMap<String, Instant> = store.access_snapshot().into_iter().collect();
            let newest_removed = before
                .iter()
                .filter(|(k, _)| !retained.contains_key(*k))
                .map(|(_, t)| *t)
                .max();
            let oldest_retained = retained.values().copied().min();
            if let (Some(removed_at), Some(retained_at)) = (newest_removed, oldest_retained) {
                assert!(removed_at <= retained_at);
            }
        });
    }

    // After expiry, nothing idle past the ttl survives and nothing within it is lost.
    #[test]
    fn prop_expiry_invariant(ages in prop::collection::vec(0u64..100, 1..40), ttl in 1u64..100) {
        with_paused_clock(async {
            let store = counting_store(Arc::new(AtomicUsize::new(0)));
            let start = Instant::now();
            let horizon = 100u64;

            // Insert oldest first so each key ends up with the requested age
            let mut ordered: Vec<(usize, u64)> = ages.iter().copied().enumerate().collect();
            ordered.sort_by(|a, b| b.1.cmp(&a.1));
            for (index, age) in &ordered {
                let at = start + Duration::from_secs(horizon - age);
                tokio::time::advance(at.saturating_duration_since(Instant::now())).await;
                store.get_or_load(&format!("/k{}", index));
            }

            let now = start + Duration::from_secs(horizon);
            let ttl = Duration::from_secs(ttl);
            remove_expired_at(&store, ttl, now);

            for (index, age) in ages.iter().enumerate() {
                let key = format!("/k{}", index);
                if Duration::from_secs(*age) > ttl {
                    assert!(!store.contains(&key), "{} should have expired", key);
                } else {
                    assert!(store.contains(&key), "{} should be retained", key);
                }
            }
        });
    }
}
