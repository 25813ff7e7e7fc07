//! VN Cache - resource caching for a page-based visual-novel runtime
//!
//! Keeps decoded images, open audio handles, dialogue text and page records
//! in per-kind stores with least-recently-used trimming and idle expiry,
//! warms neighbouring pages in the background with bounded concurrency, and
//! trims everything when process memory crosses a threshold.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod preload;
pub mod service;
pub mod tasks;

pub use cache::CacheStatistics;
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use models::{Page, PageRecord, PathResolver, ProjectLayout};
pub use preload::{PreloadPriority, PreloadRequest};
pub use service::{open_page, ResourceCache};
