//! Seekable circular byte cache.
//!
//! A producer thread `write`s bytes pulled from a slow source, a consumer thread
//! `wait_for_data`s, `read`s and `seek`s. Bytes the consumer already read stay
//! in memory up to the backward capacity so short backward seeks never touch the
//! source.
//!
//! ## Offsets
//!
//! ```text
//!   beg                cur                      end
//!    |<-- history ----->|<------ unread -------->|
//!    |   (<= capacity)  |  (<= forward capacity) |
//! ```
//!
//! Offsets are logical positions in the stream and only grow (except on
//! `reset`). The byte at offset `o` lives at `o % capacity` in storage.
//!
//! ## Module Organization
//!
//! - `circular` - The cache itself
//! - `storage` - Heap and mapped backing stores
//! - `end_of_input` - End-of-stream predicate polled by the cache

pub mod circular;
pub mod end_of_input;
pub mod storage;

pub use circular::CircularCache;
pub use end_of_input::{ EndOfInput, EndOfInputFlag };
pub use storage::{ BackingKind, BackingStore, HeapStore, MappedStore };

use std::time::Duration;

use serde::{ Deserialize, Serialize };

use crate::constants::{
    DEFAULT_BACK_CAPACITY,
    DEFAULT_FORWARD_CAPACITY,
    DEFAULT_LOOKAHEAD_TIMEOUT,
    DEFAULT_LOOKAHEAD_WINDOW,
    DEFAULT_WAIT_SLICE,
};
use crate::error::{ CacheError, Result };

/// Result of a non-blocking read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// This many bytes were copied out (zero only for an empty output buffer)
    Data(usize),
    /// Nothing buffered at the cursor yet; wait and retry
    WouldBlock,
    /// Nothing buffered at the cursor and the source is exhausted
    EndOfInput,
}

impl ReadOutcome {
    /// Byte count for `Data`, `None` otherwise
    pub fn bytes(&self) -> Option<usize> {
        match self {
            ReadOutcome::Data(n) => Some(*n),
            _ => None,
        }
    }
}

/// Consistent view of the three offsets taken under one lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursors {
    pub beg: u64,
    pub cur: u64,
    pub end: u64,
}

impl Cursors {
    /// Unread bytes ahead of the cursor
    pub fn available(&self) -> u64 {
        self.end - self.cur
    }

    /// Consumed bytes still held behind the cursor
    pub fn history(&self) -> u64 {
        self.cur - self.beg
    }
}

/// Configuration for cache behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Bytes the producer may run ahead of the read cursor
    pub forward_capacity: usize,
    /// Consumed bytes retained for backward seeks
    pub back_capacity: usize,
    /// Allocation strategy for storage
    pub backing: BackingKind,
    /// Pin mapped storage in RAM (ignored for heap storage)
    pub lock_memory: bool,
    /// Distance past the written end within which a seek waits for data
    pub lookahead_window: u64,
    /// How long such a seek waits
    pub lookahead_timeout: Duration,
    /// Longest sleep between re-checks in timed waits
    pub wait_slice: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            forward_capacity: DEFAULT_FORWARD_CAPACITY,
            back_capacity: DEFAULT_BACK_CAPACITY,
            backing: BackingKind::Heap,
            lock_memory: false,
            lookahead_window: DEFAULT_LOOKAHEAD_WINDOW,
            lookahead_timeout: DEFAULT_LOOKAHEAD_TIMEOUT,
            wait_slice: DEFAULT_WAIT_SLICE,
        }
    }
}

impl CacheConfig {
    /// Create a new configuration with the given forward and backward capacities
    pub fn new(forward_capacity: usize, back_capacity: usize) -> Result<Self> {
        let config = Self {
            forward_capacity,
            back_capacity,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants a deserialized or hand-built config must satisfy
    pub fn validate(&self) -> Result<()> {
        if self.forward_capacity == 0 {
            return Err(CacheError::config("Forward capacity must be greater than 0"));
        }
        if self.forward_capacity.checked_add(self.back_capacity).is_none() {
            return Err(
                crate::config_error!(
                    "Total capacity overflows: {} + {}",
                    self.forward_capacity,
                    self.back_capacity
                )
            );
        }
        if self.wait_slice.is_zero() {
            return Err(CacheError::config("Wait slice must be greater than 0"));
        }
        Ok(())
    }

    /// Total storage size
    pub fn capacity(&self) -> usize {
        self.forward_capacity + self.back_capacity
    }

    /// Set the allocation strategy
    pub fn with_backing(mut self, backing: BackingKind) -> Self {
        self.backing = backing;
        self
    }

    /// Enable or disable mlock of mapped storage
    pub fn with_memory_lock(mut self, enable: bool) -> Self {
        self.lock_memory = enable;
        self
    }

    /// Set how far past the written end a seek may wait for data
    pub fn with_lookahead_window(mut self, window: u64) -> Self {
        self.lookahead_window = window;
        self
    }

    /// Set how long a lookahead seek waits
    pub fn with_lookahead_timeout(mut self, timeout: Duration) -> Self {
        self.lookahead_timeout = timeout;
        self
    }

    /// Set the wait slice
    pub fn with_wait_slice(mut self, slice: Duration) -> Result<Self> {
        if slice.is_zero() {
            return Err(CacheError::config("Wait slice must be greater than 0"));
        }
        self.wait_slice = slice;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_creation() {
        let config = CacheConfig::new(100, 50).unwrap();
        assert_eq!(config.capacity(), 150);
        assert_eq!(config.backing, BackingKind::Heap);
        assert_eq!(config.lookahead_window, DEFAULT_LOOKAHEAD_WINDOW);
    }

    #[test]
    fn test_cache_config_invalid_capacity() {
        assert!(CacheConfig::new(0, 50).is_err());
        assert!(CacheConfig::new(usize::MAX, 1).is_err());
        assert!(CacheConfig::new(1, 0).is_ok());
    }

    #[test]
    fn test_cache_config_builder() {
        let config = CacheConfig::new(1024, 256)
            .unwrap()
            .with_backing(BackingKind::Mapped)
            .with_memory_lock(true)
            .with_lookahead_window(10)
            .with_lookahead_timeout(Duration::from_millis(20))
            .with_wait_slice(Duration::from_millis(5))
            .unwrap();

        assert_eq!(config.backing, BackingKind::Mapped);
        assert!(config.lock_memory);
        assert_eq!(config.lookahead_window, 10);
        assert_eq!(config.lookahead_timeout, Duration::from_millis(20));
        assert_eq!(config.wait_slice, Duration::from_millis(5));
    }

    #[test]
    fn test_cache_config_invalid_wait_slice() {
        let result = CacheConfig::new(1024, 0).unwrap().with_wait_slice(Duration::ZERO);
        assert!(result.is_err());
    }

    #[test]
    fn test_cache_config_partial_document_fills_defaults() {
        let json = r#"{"forward_capacity":1024,"backing":"mapped"}"#;
        let config: CacheConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.forward_capacity, 1024);
        assert_eq!(config.backing, BackingKind::Mapped);
        assert_eq!(config.back_capacity, DEFAULT_BACK_CAPACITY);
        assert!(!config.lock_memory);
        assert_eq!(config.lookahead_window, DEFAULT_LOOKAHEAD_WINDOW);
        assert_eq!(config.lookahead_timeout, DEFAULT_LOOKAHEAD_TIMEOUT);
        assert_eq!(config.wait_slice, DEFAULT_WAIT_SLICE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cache_config_serde_round_trip() {
        let config = CacheConfig::new(4096, 512)
            .unwrap()
            .with_backing(BackingKind::Mapped)
            .with_lookahead_timeout(Duration::from_millis(250));

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""backing":"mapped""#));

        let parsed: CacheConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(serde_json::from_str::<CacheConfig>("{}").unwrap(), CacheConfig::default());
    }

    #[test]
    fn test_cache_config_rejects_unknown_backing() {
        assert!(serde_json::from_str::<CacheConfig>(r#"{"backing":"Heap"}"#).is_err());
        assert!(serde_json::from_str::<CacheConfig>(r#"{"backing":"disk"}"#).is_err());
    }

    #[test]
    fn test_cache_config_deserialized_values_still_validated() {
        let json = r#"{"wait_slice":{"secs":0,"nanos":0}}"#;
        let config: CacheConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(config.validate(), Err(CacheError::InvalidConfig { .. })));

        let config: CacheConfig = serde_json::from_str(r#"{"forward_capacity":0}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cursors() {
        let c = Cursors { beg: 10, cur: 25, end: 40 };
        assert_eq!(c.available(), 15);
        assert_eq!(c.history(), 15);
    }

    #[test]
    fn test_read_outcome_bytes() {
        assert_eq!(ReadOutcome::Data(7).bytes(), Some(7));
        assert_eq!(ReadOutcome::WouldBlock.bytes(), None);
        assert_eq!(ReadOutcome::EndOfInput.bytes(), None);
    }
}
