//! Error types and handling for the cache

use std::io::SeekFrom;

use thiserror::Error;

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Main error type for the cache.
///
/// `WouldBlock` and end-of-input are not errors; they are reported through
/// [`ReadOutcome`](crate::cache::ReadOutcome).
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backing storage could not be obtained
    #[error("Memory allocation error: {message}")]
    Allocation {
        /// Error message describing the allocation failure
        message: String,
    },

    /// Invalid configuration parameter
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Only absolute (`SeekFrom::Start`) seeks are supported
    #[error("Unsupported seek mode: {0:?}")]
    UnsupportedSeekMode(SeekFrom),

    /// Target lies outside the retained window; the source must be
    /// repositioned and the cache reset
    #[error("Seek to {position} outside cached range [{beg}, {end}]")]
    SeekOutOfRange {
        /// Requested absolute position
        position: u64,
        /// Oldest retained offset at the time of the seek
        beg: u64,
        /// One past the newest written offset at the time of the seek
        end: u64,
    },

    /// Storage access on a cache that is not open
    #[error("Cache is not open")]
    Closed,
}

impl CacheError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a new allocation error
    pub fn allocation(message: impl Into<String>) -> Self {
        Self::Allocation {
            message: message.into(),
        }
    }

    /// Check if the caller can recover without recreating the cache
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SeekOutOfRange { .. } | Self::UnsupportedSeekMode(_))
    }

    /// Check if this error is related to system resources
    pub fn is_system_resource_error(&self) -> bool {
        matches!(self, Self::Allocation { .. })
    }
}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::error::CacheError::config(format!($($arg)*))
    };
}
