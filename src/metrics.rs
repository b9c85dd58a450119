//! Metrics for the cache.
//!
//! Lightweight counters for observability

use std::sync::atomic::{ AtomicU64, Ordering };

/// Per-cache counters
pub struct CacheMetrics {
    pub bytes_written: AtomicU64,
    pub bytes_read: AtomicU64,
    pub short_writes: AtomicU64,
    pub data_signals: AtomicU64,
    pub would_block_reads: AtomicU64,
    pub seek_hits: AtomicU64,
    pub seek_misses: AtomicU64,
    pub wait_timeouts: AtomicU64,
    pub resets: AtomicU64,
}

impl CacheMetrics {
    pub const fn new() -> Self {
        Self {
            bytes_written: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
            short_writes: AtomicU64::new(0),
            data_signals: AtomicU64::new(0),
            would_block_reads: AtomicU64::new(0),
            seek_hits: AtomicU64::new(0),
            seek_misses: AtomicU64::new(0),
            wait_timeouts: AtomicU64::new(0),
            resets: AtomicU64::new(0),
        }
    }

    /// Record one write call; `accepted < requested` counts as a short write
    #[inline]
    pub fn record_write(&self, requested: usize, accepted: usize) {
        self.bytes_written.fetch_add(accepted as u64, Ordering::Relaxed);
        if accepted < requested {
            self.short_writes.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_data_signal(&self) {
        self.data_signals.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_read(&self, bytes: usize) {
        self.bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_would_block(&self) {
        self.would_block_reads.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_seek(&self, hit: bool) {
        if hit {
            self.seek_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.seek_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_wait_timeout(&self) {
        self.wait_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            short_writes: self.short_writes.load(Ordering::Relaxed),
            data_signals: self.data_signals.load(Ordering::Relaxed),
            would_block_reads: self.would_block_reads.load(Ordering::Relaxed),
            seek_hits: self.seek_hits.load(Ordering::Relaxed),
            seek_misses: self.seek_misses.load(Ordering::Relaxed),
            wait_timeouts: self.wait_timeouts.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.bytes_written.store(0, Ordering::Relaxed);
        self.bytes_read.store(0, Ordering::Relaxed);
        self.short_writes.store(0, Ordering::Relaxed);
        self.data_signals.store(0, Ordering::Relaxed);
        self.would_block_reads.store(0, Ordering::Relaxed);
        self.seek_hits.store(0, Ordering::Relaxed);
        self.seek_misses.store(0, Ordering::Relaxed);
        self.wait_timeouts.store(0, Ordering::Relaxed);
        self.resets.store(0, Ordering::Relaxed);
    }
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetricsSnapshot {
    pub bytes_written: u64,
    pub bytes_read: u64,
    pub short_writes: u64,
    pub data_signals: u64,
    pub would_block_reads: u64,
    pub seek_hits: u64,
    pub seek_misses: u64,
    pub wait_timeouts: u64,
    pub resets: u64,
}

impl CacheMetricsSnapshot {
    /// Fraction of seeks served from memory, `None` before the first seek
    pub fn seek_hit_ratio(&self) -> Option<f64> {
        let total = self.seek_hits + self.seek_misses;
        if total == 0 {
            None
        } else {
            Some((self.seek_hits as f64) / (total as f64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        let m = CacheMetrics::new();
        m.record_write(100, 100);
        m.record_write(100, 20);
        m.record_read(60);
        m.record_seek(true);
        m.record_seek(false);

        let s = m.snapshot();
        assert_eq!(s.bytes_written, 120);
        assert_eq!(s.short_writes, 1);
        assert_eq!(s.bytes_read, 60);
        assert_eq!(s.seek_hit_ratio(), Some(0.5));

        m.reset();
        assert_eq!(m.snapshot(), CacheMetricsSnapshot::default());
    }

    #[test]
    fn test_hit_ratio_without_seeks() {
        assert_eq!(CacheMetricsSnapshot::default().seek_hit_ratio(), None);
    }
}
