//! CircularCache - seekable ring buffer between a stream reader and its consumer
//!
//! One mutex guards the offsets and the storage. Two condition variables carry
//! the only cross-thread signals: `written` (more data may be available) and
//! `space` (the producer may have room again). Waiters always re-check the real
//! condition under the lock after waking, so a missed or spurious notification
//! only costs one wait slice.
//!
//! ## APIs
//!
//! Producer side:
//! - `write()` - Copy as much as fits, never blocks
//! - `wait_for_space()` - Bounded wait for room ahead of the cursor
//!
//! Consumer side:
//! - `wait_for_data()` - Bounded wait for unread bytes
//! - `read()` - Copy out unread bytes, never blocks
//! - `seek()` - Move the cursor inside the retained window
//!
//! Either side, after repositioning the source out of band:
//! - `reset()` - Discard everything and restart at a new offset

use std::io::SeekFrom;
use std::sync::Arc;
use std::time::{ Duration, Instant };

use parking_lot::{ Condvar, Mutex, MutexGuard };

use crate::cache::end_of_input::{ EndOfInput, EndOfInputFlag };
use crate::cache::storage::{ self, BackingKind, BackingStore };
use crate::cache::{ CacheConfig, Cursors, ReadOutcome };
use crate::error::{ CacheError, Result };
use crate::insights;
use crate::metrics::CacheMetrics;

/// Offsets and storage, only touched with the lock held
struct CacheState {
    /// Oldest offset still present in storage
    beg: u64,
    /// One past the last written offset
    end: u64,
    /// Read cursor
    cur: u64,
    /// `None` while closed
    storage: Option<Box<dyn BackingStore>>,
}

impl CacheState {
    #[inline(always)]
    fn ahead(&self) -> u64 {
        self.end - self.cur
    }

    fn cursors(&self) -> Cursors {
        Cursors {
            beg: self.beg,
            cur: self.cur,
            end: self.end,
        }
    }
}

/// Fixed-capacity byte cache with a retained history window.
///
/// Storage is `forward_capacity + back_capacity` bytes. The producer may run at
/// most `forward_capacity` bytes ahead of the read cursor; everything older than
/// `capacity` bytes behind the newest byte is evicted. The cache must be
/// [`open`](Self::open)ed before `write`/`read`; offset-only operations
/// (`seek`, `reset`, waits) work in any state.
///
/// Invariants, after every operation:
/// - `beg <= cur <= end`
/// - `end - beg <= capacity`
pub struct CircularCache {
    config: CacheConfig,
    /// Cached `config.capacity()`
    capacity: usize,
    state: Mutex<CacheState>,
    written: Condvar,
    space: Condvar,
    eof_flag: EndOfInputFlag,
    external_eof: Option<Arc<dyn EndOfInput>>,
    metrics: CacheMetrics,
}

impl CircularCache {
    /// Create a closed cache with default settings
    pub fn new(forward_capacity: usize, back_capacity: usize) -> Result<Self> {
        Self::with_config(CacheConfig::new(forward_capacity, back_capacity)?)
    }

    /// Create a closed cache; end-of-input is driven by [`set_end_of_input`](Self::set_end_of_input)
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            capacity: config.capacity(),
            config,
            state: Mutex::new(CacheState {
                beg: 0,
                end: 0,
                cur: 0,
                storage: None,
            }),
            written: Condvar::new(),
            space: Condvar::new(),
            eof_flag: EndOfInputFlag::new(),
            external_eof: None,
            metrics: CacheMetrics::new(),
        })
    }

    /// Create a closed cache that also polls `source` for end-of-input.
    ///
    /// `source` is polled with the cache lock held and must not call any
    /// method of this cache (see [`EndOfInput`]).
    pub fn with_end_of_input(config: CacheConfig, source: Arc<dyn EndOfInput>) -> Result<Self> {
        let mut cache = Self::with_config(config)?;
        cache.external_eof = Some(source);
        Ok(cache)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Allocate storage and restart at offset 0.
    ///
    /// Opening an open cache replaces its storage.
    pub fn open(&self) -> Result<()> {
        let storage = storage::allocate(self.config.backing, self.capacity, self.config.lock_memory)?;

        let mut state = self.state.lock();
        state.storage = Some(storage);
        state.beg = 0;
        state.end = 0;
        state.cur = 0;
        drop(state);

        insights::record_open(self.capacity, self.config.backing.as_str());
        Ok(())
    }

    /// Release storage. Safe to call any number of times.
    pub fn close(&self) {
        let released = self.state.lock().storage.take();
        if released.is_some() {
            insights::record_close(self.capacity);
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().storage.is_some()
    }

    // ========================================================================
    // Producer API
    // ========================================================================

    /// Copy up to `data.len()` bytes in at the write end.
    ///
    /// Accepts no more than fits in front of the cursor and never crosses the
    /// physical end of storage, so the count may be short, or zero, without any
    /// error. Callers loop on the remainder. The "data written" signal is raised
    /// on every call, including zero-byte ones.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let pos = self.slot(state.end);
        let limit = self.forward_limit(state);
        let wrap = self.capacity - pos;
        let len = data.len().min(limit).min(wrap);

        let storage = state.storage.as_deref_mut().ok_or(CacheError::Closed)?;
        storage.as_mut_slice()[pos..pos + len].copy_from_slice(&data[..len]);

        state.end += len as u64;

        // drop history that was overwritten
        let capacity = self.capacity as u64;
        if state.end - state.beg > capacity {
            state.beg = state.end - capacity;
        }
        drop(guard);

        self.metrics.record_write(data.len(), len);
        if len < data.len() {
            insights::record_short_write(data.len(), len);
        }

        self.metrics.record_data_signal();
        self.written.notify_all();

        Ok(len)
    }

    /// Wait until at least `minimum` bytes can be written or `timeout` passes.
    ///
    /// Returns the room ahead of the cursor at exit (ignoring the wrap point,
    /// which only splits a write in two). `minimum` is clamped to the forward
    /// capacity.
    pub fn wait_for_space(&self, minimum: usize, timeout: Duration) -> usize {
        if timeout.is_zero() {
            return self.forward_limit(&self.state.lock());
        }

        let minimum = minimum.min(self.config.forward_capacity) as u64;
        let free = self.timed_wait(&self.space, minimum, timeout, false, |state| {
            self.forward_limit(state) as u64
        });
        free as usize
    }

    // ========================================================================
    // Consumer API
    // ========================================================================

    /// Copy unread bytes at the cursor into `out`.
    ///
    /// Stops at the physical end of storage; the next call continues from the
    /// start. With nothing buffered returns `EndOfInput` once the source is
    /// exhausted and `WouldBlock` before that. The end-of-input source is
    /// polled under the cache lock.
    pub fn read(&self, out: &mut [u8]) -> Result<ReadOutcome> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let storage = state.storage.as_deref().ok_or(CacheError::Closed)?;
        let pos = self.slot(state.cur);
        let avail = ((self.capacity - pos) as u64).min(state.end - state.cur) as usize;

        if avail == 0 {
            // decided under the lock: a final write followed by end-of-input
            // must never read as EndOfInput
            if self.is_end_of_input() {
                return Ok(ReadOutcome::EndOfInput);
            }
            let cur = state.cur;
            drop(guard);
            self.metrics.record_would_block();
            insights::record_would_block(cur);
            return Ok(ReadOutcome::WouldBlock);
        }

        let len = out.len().min(avail);
        out[..len].copy_from_slice(&storage.as_slice()[pos..pos + len]);
        state.cur += len as u64;
        drop(guard);

        if len > 0 {
            self.metrics.record_read(len);
            self.space.notify_all();
        }

        Ok(ReadOutcome::Data(len))
    }

    /// Wait until `minimum` unread bytes are buffered, the source ends, or
    /// `timeout` passes. Returns the unread byte count at exit.
    ///
    /// A zero `timeout`, or an exhausted source, makes this a plain peek.
    /// `minimum` is clamped to the forward capacity since no amount of waiting
    /// can buffer more than that ahead of the cursor. Returning fewer than
    /// `minimum` bytes is not an error.
    pub fn wait_for_data(&self, minimum: u64, timeout: Duration) -> u64 {
        if timeout.is_zero() || self.is_end_of_input() {
            return self.state.lock().ahead();
        }

        let minimum = minimum.min(self.config.forward_capacity as u64);
        self.timed_wait(&self.written, minimum, timeout, true, CacheState::ahead)
    }

    /// Move the read cursor to an absolute offset inside `[beg, end]`.
    ///
    /// Only `SeekFrom::Start` is supported. A target just past the written end
    /// (within the lookahead window) first waits for the producer to get there.
    /// `SeekOutOfRange` means the source has to be repositioned and the cache
    /// [`reset`](Self::reset).
    pub fn seek(&self, pos: SeekFrom) -> Result<u64> {
        let position = match pos {
            SeekFrom::Start(position) => position,
            other => {
                return Err(CacheError::UnsupportedSeekMode(other));
            }
        };

        let mut state = self.state.lock();

        // just past the written end: give the producer a chance to get there
        if position >= state.end && position < state.end.saturating_add(self.config.lookahead_window) {
            let gap = position - state.cur;
            insights::record_lookahead(position, state.end);
            MutexGuard::unlocked(&mut state, || {
                self.wait_for_data(gap, self.config.lookahead_timeout);
            });
        }

        if position >= state.beg && position <= state.end {
            let moved_forward = position > state.cur;
            state.cur = position;
            drop(state);

            self.metrics.record_seek(true);
            if moved_forward {
                self.space.notify_all();
            }
            return Ok(position);
        }

        let (beg, end) = (state.beg, state.end);
        drop(state);

        self.metrics.record_seek(false);
        insights::record_seek_miss(position, beg, end);
        Err(CacheError::SeekOutOfRange { position, beg, end })
    }

    /// Discard all buffered bytes and restart every offset at `position`.
    ///
    /// For use after the caller repositioned the source itself.
    pub fn reset(&self, position: u64) {
        let mut state = self.state.lock();
        state.beg = position;
        state.end = position;
        state.cur = position;
        drop(state);

        self.metrics.record_reset();
        insights::record_reset(position);
        self.space.notify_all();
    }

    // ========================================================================
    // End of input
    // ========================================================================

    /// True once the owned flag is set or the external source reports the end
    pub fn is_end_of_input(&self) -> bool {
        self.eof_flag.is_end_of_input() ||
            self.external_eof.as_ref().is_some_and(|source| source.is_end_of_input())
    }

    /// Mark the stream as finished and wake data waiters
    pub fn set_end_of_input(&self) {
        self.eof_flag.set();
        // notify with the lock held so a waiter between its check and its
        // wait cannot miss the wakeup
        let _state = self.state.lock();
        self.written.notify_all();
    }

    pub fn clear_end_of_input(&self) {
        self.eof_flag.clear();
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    pub fn forward_capacity(&self) -> usize {
        self.config.forward_capacity
    }

    #[inline(always)]
    pub fn back_capacity(&self) -> usize {
        self.config.back_capacity
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn backing_kind(&self) -> BackingKind {
        self.config.backing
    }

    /// Current read cursor
    pub fn position(&self) -> u64 {
        self.state.lock().cur
    }

    /// Unread bytes ahead of the cursor
    pub fn available(&self) -> u64 {
        self.state.lock().ahead()
    }

    pub fn cursors(&self) -> Cursors {
        self.state.lock().cursors()
    }

    /// Whether a seek to `position` would be served from memory right now
    pub fn is_cached_position(&self, position: u64) -> bool {
        let state = self.state.lock();
        position >= state.beg && position <= state.end
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Physical index of a logical offset. The only place wrap math happens.
    #[inline(always)]
    fn slot(&self, offset: u64) -> usize {
        (offset % (self.capacity as u64)) as usize
    }

    /// Room before `end` would run more than the forward capacity ahead of
    /// `cur`. Zero after a backward seek that left more than that unread.
    #[inline(always)]
    fn forward_limit(&self, state: &CacheState) -> usize {
        (self.config.forward_capacity as u64).saturating_sub(state.ahead()) as usize
    }

    /// Sleep on `signal` in slices until `measure` reaches `minimum`, the
    /// deadline passes, or (with `stop_on_eof`) the input ends.
    fn timed_wait<F>(
        &self,
        signal: &Condvar,
        minimum: u64,
        timeout: Duration,
        stop_on_eof: bool,
        measure: F
    ) -> u64
        where F: Fn(&CacheState) -> u64
    {
        // an unrepresentable deadline waits until the condition holds
        let deadline = Instant::now().checked_add(timeout);

        let mut state = self.state.lock();
        let mut amount = measure(&*state);

        while amount < minimum && !(stop_on_eof && self.is_end_of_input()) {
            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        self.metrics.record_wait_timeout();
                        break;
                    }
                    (deadline - now).min(self.config.wait_slice)
                }
                None => self.config.wait_slice,
            };

            signal.wait_for(&mut state, slice);
            amount = measure(&*state);
        }

        amount
    }
}

impl Drop for CircularCache {
    fn drop(&mut self) {
        self.close();
    }
}
