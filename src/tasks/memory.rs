//! Process memory sampling and reclamation hints.

use crate::error::{CacheError, Result};

/// Resident set size of the current process in bytes.
#[cfg(target_os = "linux")]
pub fn process_memory_bytes() -> Result<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm")?;
    let rss_pages = statm
        .split_whitespace()
        .nth(1)
        .and_then(|field| field.parse::<u64>().ok())
        .ok_or_else(|| CacheError::MemorySampling(format!("unexpected statm: {}", statm.trim())))?;

    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page_size <= 0 {
        return Err(CacheError::MemorySampling(
            "page size unavailable".to_string(),
        ));
    }
    Ok(rss_pages.saturating_mul(page_size as u64))
}

#[cfg(not(target_os = "linux"))]
pub fn process_memory_bytes() -> Result<u64> {
    Err(CacheError::MemorySampling(
        "process memory sampling is not supported on this platform".to_string(),
    ))
}

/// Asks the allocator to hand freed memory back to the operating system.
pub fn release_free_memory() {
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    unsafe {
        libc::malloc_trim(0);
    }
}
