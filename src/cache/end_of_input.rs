//! End-of-input predicate
//!
//! The cache never decides on its own that the stream is over. It polls an
//! `EndOfInput` source to tell `WouldBlock` from `EndOfInput` on empty reads and
//! to cut waits short.

use std::sync::atomic::{ AtomicBool, Ordering };

/// Answers whether the producer has delivered the last byte of the stream
///
/// # Locking
///
/// The cache calls `is_end_of_input` while holding its internal lock, so that
/// a final write followed by end-of-input is never mistaken for an empty,
/// finished stream. Implementations must answer from their own state and must
/// not call back into the cache they are attached to: the lock is not
/// reentrant and such a call deadlocks.
pub trait EndOfInput: Send + Sync {
    fn is_end_of_input(&self) -> bool;
}

impl<F> EndOfInput for F where F: Fn() -> bool + Send + Sync {
    #[inline]
    fn is_end_of_input(&self) -> bool {
        self()
    }
}

/// Settable end-of-input marker
#[derive(Debug, Default)]
pub struct EndOfInputFlag {
    reached: AtomicBool,
}

impl EndOfInputFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.reached.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.reached.store(false, Ordering::Release);
    }
}

impl EndOfInput for EndOfInputFlag {
    #[inline]
    fn is_end_of_input(&self) -> bool {
        self.reached.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_flag_set_and_clear() {
        let flag = EndOfInputFlag::new();
        assert!(!flag.is_end_of_input());

        flag.set();
        assert!(flag.is_end_of_input());

        flag.clear();
        assert!(!flag.is_end_of_input());
    }

    #[test]
    fn test_closure_predicate() {
        let source_done = Arc::new(AtomicBool::new(false));
        let probe = source_done.clone();
        let predicate = move || probe.load(Ordering::Acquire);

        assert!(!predicate.is_end_of_input());
        source_done.store(true, Ordering::Release);
        assert!(predicate.is_end_of_input());
    }
}
