//! Error types for the resource cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the resource cache.
///
/// Cache lookups never return it: load and decode failures are logged and
/// resolved to a cache miss. Configuration calls and [`crate::open_page`]
/// return it directly.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Resource path empty or file absent
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Filesystem failure while reading a resource
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Page record could not be parsed
    #[error("Invalid page record: {0}")]
    InvalidPage(#[from] serde_json::Error),

    /// Image could not be decoded
    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    /// Resource content is malformed
    #[error("Decode error: {0}")]
    Decode(String),

    /// Releasing a resource failed
    #[error("Disposal failed: {0}")]
    Dispose(String),

    /// Process memory usage could not be read
    #[error("Memory sampling failed: {0}")]
    MemorySampling(String),

    /// Rejected configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

// == Result Type Alias ==
/// Convenience Result type for the resource cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CacheError = io.into();
        assert!(matches!(err, CacheError::Io(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_json_error_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: CacheError = parse.into();
        assert!(matches!(err, CacheError::InvalidPage(_)));
    }

    #[test]
    fn test_configuration_message() {
        let err = CacheError::InvalidConfiguration("max_entries must be positive".into());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: max_entries must be positive"
        );
    }
}
