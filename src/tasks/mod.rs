//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the reader.
//!
//! # Tasks
//! - Memory Monitor: samples process memory and cleans the caches under pressure

pub mod memory;
mod monitor;

pub use memory::{process_memory_bytes, release_free_memory};
pub use monitor::{check_memory, default_probe, spawn_memory_monitor, MemoryProbe, MonitorOutcome};
