//! Insights - Observability for the cache.
//!
//! Tracing hooks for the interesting cache events. Zero-cost when disabled.
//!
//! # Usage
//!
//! ## Basic tracing (console output)
//! ```toml
//! seekcache = { version = "0.1", features = ["console"] }
//! ```
//! ```rust,ignore
//! seekcache::init_console();
//! ```
//!
//! With only the `tracing` feature the events go to whatever subscriber the
//! application installed.

/// Install a console subscriber at `TRACE` level (call once at startup).
///
/// Returns `false` when a global subscriber is already set.
#[cfg(feature = "console")]
pub fn init_console() -> bool {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}

#[cfg(not(feature = "console"))]
pub fn init_console() -> bool {
    false
}

/// Storage was allocated
#[cfg(feature = "tracing")]
#[inline]
pub fn record_open(capacity: usize, backing: &str) {
    tracing::debug!(capacity, backing, "cache opened");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_open(_capacity: usize, _backing: &str) {}

/// Storage was released
#[cfg(feature = "tracing")]
#[inline]
pub fn record_close(capacity: usize) {
    tracing::debug!(capacity, "cache closed");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_close(_capacity: usize) {}

/// A write accepted fewer bytes than offered (forward limit or wrap point)
#[cfg(feature = "tracing")]
#[inline]
pub fn record_short_write(requested: usize, accepted: usize) {
    let _span = tracing::trace_span!("short_write", requested, accepted).entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_short_write(_requested: usize, _accepted: usize) {}

/// A read found nothing buffered at the cursor
#[cfg(feature = "tracing")]
#[inline]
pub fn record_would_block(cur: u64) {
    let _span = tracing::trace_span!("would_block", cur).entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_would_block(_cur: u64) {}

/// A seek landed just past the written end and waits for the producer
#[cfg(feature = "tracing")]
#[inline]
pub fn record_lookahead(position: u64, end: u64) {
    tracing::trace!(position, end, "seek waiting for lookahead data");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_lookahead(_position: u64, _end: u64) {}

/// A seek could not be served from memory
#[cfg(feature = "tracing")]
#[inline]
pub fn record_seek_miss(position: u64, beg: u64, end: u64) {
    tracing::debug!(position, beg, end, "seek outside cached range");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_seek_miss(_position: u64, _beg: u64, _end: u64) {}

/// Offsets were moved to a new logical base
#[cfg(feature = "tracing")]
#[inline]
pub fn record_reset(position: u64) {
    tracing::debug!(position, "cache reset");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_reset(_position: u64) {}
