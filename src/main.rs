//! VN Cache - preload runner
//!
//! Opens each page file given on the command line, warms it and its
//! neighbours, waits for the preload queue to drain and prints the cache
//! statistics as JSON.
//!
//! The project root comes from `PROJECT_ROOT`, or else is the grandparent
//! directory of the first page file.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vn_cache::{open_page, CacheConfig, ProjectLayout, ResourceCache};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vn_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pages: Vec<PathBuf> = env::args_os().skip(1).map(PathBuf::from).collect();
    if pages.is_empty() {
        bail!("usage: vn_cache <page.json>...");
    }

    let layout = match env::var_os("PROJECT_ROOT") {
        Some(root) => ProjectLayout::new(root),
        None => ProjectLayout::for_page(&pages[0])
            .with_context(|| format!("{} has no project root", pages[0].display()))?,
    };
    info!(root = %layout.root().display(), "Using project layout");

    let config = CacheConfig::from_env();
    let cache = ResourceCache::new(config, Arc::new(layout)).context("invalid cache configuration")?;

    for path in &pages {
        match open_page(path) {
            Ok(page) => cache.preload_page(&page),
            Err(e) => warn!(page = %path.display(), error = %e, "Skipping page"),
        }
    }
    cache.wait_for_preloads().await;

    let stats = cache.get_statistics();
    println!("{}", serde_json::to_string_pretty(&stats)?);

    cache.shutdown();
    info!("Preload run complete");
    Ok(())
}
