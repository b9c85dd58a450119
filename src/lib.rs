//! # seekcache
//!
//! Seekable circular byte cache that sits between a slow stream reader
//! (network, disk) and its consumer (demuxer, playback pipeline).
//!
//! The producer thread writes whatever the source delivers; the consumer waits,
//! reads and seeks. Already-consumed bytes are kept up to a configurable
//! backward capacity, so short backward seeks are served from memory instead of
//! repositioning the source.
//!
//! ```rust
//! use std::io::SeekFrom;
//! use std::time::Duration;
//! use seekcache::{ CircularCache, ReadOutcome };
//!
//! let cache = CircularCache::new(100, 50)?;
//! cache.open()?;
//!
//! assert_eq!(cache.write(&[1u8; 80])?, 80);
//! assert_eq!(cache.wait_for_data(40, Duration::from_millis(10)), 80);
//!
//! let mut out = [0u8; 60];
//! assert_eq!(cache.read(&mut out)?, ReadOutcome::Data(60));
//!
//! // history is still there
//! assert_eq!(cache.seek(SeekFrom::Start(10))?, 10);
//! # Ok::<(), seekcache::CacheError>(())
//! ```
//!
//! ## Features
//!
//! - `tracing` - emit `tracing` events for opens, short writes, seek misses, resets
//! - `console` - `init_console()` installs a stdout subscriber

pub mod cache;
pub mod constants;
pub mod error;
pub mod insights;
pub mod metrics;

pub use cache::{
    BackingKind,
    BackingStore,
    CacheConfig,
    CircularCache,
    Cursors,
    EndOfInput,
    EndOfInputFlag,
    ReadOutcome,
};
pub use error::{ CacheError, Result };
pub use insights::init_console;
pub use metrics::{ CacheMetrics, CacheMetricsSnapshot };
