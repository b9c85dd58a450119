//! Cache Constants
//!
//! Defaults used by [`CacheConfig`](crate::cache::CacheConfig).

use std::time::Duration;

/// Default forward capacity: prefetched bytes ahead of the read cursor
pub const DEFAULT_FORWARD_CAPACITY: usize = 16 * 1024 * 1024; // 16 MiB

/// Default backward capacity: consumed history kept for backward seeks
pub const DEFAULT_BACK_CAPACITY: usize = 4 * 1024 * 1024; // 4 MiB

/// Distance past the written end within which a seek waits instead of failing
pub const DEFAULT_LOOKAHEAD_WINDOW: u64 = 100_000;

/// How long a lookahead seek waits for the producer
pub const DEFAULT_LOOKAHEAD_TIMEOUT: Duration = Duration::from_millis(5000);

/// Longest single sleep of a timed wait before the condition is re-checked
pub const DEFAULT_WAIT_SLICE: Duration = Duration::from_millis(50);
