//! Memory Monitor Task
//!
//! Background task that periodically samples process memory and runs a
//! cleanup pass over every store when usage crosses the configured
//! threshold.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cache::{CleanupReport, ResourceStores};
use crate::config::MIB;
use crate::error::{CacheError, Result};
use crate::tasks::memory::{process_memory_bytes, release_free_memory};

/// Source of the current process memory usage in bytes.
pub type MemoryProbe = Arc<dyn Fn() -> Result<u64> + Send + Sync>;

/// Probe reading the real process memory.
pub fn default_probe() -> MemoryProbe {
    Arc::new(process_memory_bytes)
}

/// What one monitor cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    BelowThreshold {
        usage: u64,
    },
    Cleaned {
        before: u64,
        /// Usage after cleanup, when it could be resampled
        after: Option<u64>,
        report: CleanupReport,
    },
}

/// Runs a single monitor cycle.
pub fn check_memory(stores: &ResourceStores, probe: &MemoryProbe) -> Result<MonitorOutcome> {
    let threshold = stores.config().memory_threshold;
    let usage = probe()?;
    debug!(usage_mb = usage / MIB, "Sampled process memory");

    if usage <= threshold {
        return Ok(MonitorOutcome::BelowThreshold { usage });
    }

    info!(
        usage_mb = usage / MIB,
        threshold_mb = threshold / MIB,
        "Memory usage above threshold, cleaning caches"
    );
    let report = stores.cleanup();
    release_free_memory();

    let after = match probe() {
        Ok(after) => {
            info!(usage_mb = after / MIB, removed = report.total(), "Memory after cleanup");
            Some(after)
        }
        Err(e) => {
            error!(error = %e, "Failed to resample memory after cleanup");
            None
        }
    };

    Ok(MonitorOutcome::Cleaned {
        before: usage,
        after,
        report,
    })
}

/// Spawns the periodic memory monitor.
///
/// The interval is read from the stores' configuration on every cycle. A
/// zero interval is rejected before anything is spawned. A failing cycle is
/// logged and the monitor keeps running.
///
/// # Returns
/// A JoinHandle for the spawned task, aborted on shutdown.
pub fn spawn_memory_monitor(
    stores: Arc<ResourceStores>,
    probe: MemoryProbe,
) -> Result<JoinHandle<()>> {
    let interval = stores.config().monitor_interval;
    if interval.is_zero() {
        return Err(CacheError::InvalidConfiguration(
            "monitor_interval must be a positive duration".to_string(),
        ));
    }

    Ok(tokio::spawn(async move {
        info!(
            interval_secs = interval.as_secs(),
            "Starting memory monitor"
        );

        loop {
            let interval = stores.config().monitor_interval;
            tokio::time::sleep(interval).await;

            match check_memory(&stores, &probe) {
                Ok(MonitorOutcome::BelowThreshold { usage }) => {
                    debug!(usage_mb = usage / MIB, "Memory within threshold");
                }
                Ok(MonitorOutcome::Cleaned { .. }) => {}
                Err(e) => error!(error = %e, "Memory monitor cycle failed"),
            }
        }
    }))
}
