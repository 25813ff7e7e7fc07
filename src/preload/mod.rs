//! Preload Module
//!
//! Speculative warming of pages the reader is likely to open next.

mod request;
mod scheduler;

pub use request::{discover_targets, PreloadPriority, PreloadRequest};
pub use scheduler::PreloadScheduler;
