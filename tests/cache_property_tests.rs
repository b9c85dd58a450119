//! Property tests: random operation sequences against a reference model.
//!
//! Every byte written at logical offset `o` is `byte_at(o)`, so any byte read
//! back can be checked against its offset no matter how the sequence seeked or
//! reset in between.

use proptest::prelude::*;
use seekcache::{ CacheError, CircularCache, Cursors, ReadOutcome };
use std::io::SeekFrom;
use std::time::Duration;

fn byte_at(offset: u64) -> u8 {
    (offset % 251) as u8
}

#[derive(Debug, Clone)]
enum Op {
    Write(usize),
    Read(usize),
    /// Seek to `beg + (fraction of the retained window)`, possibly a bit outside it
    Seek { back_off: u64, fraction: u8 },
    Reset(u64),
    Peek,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..64).prop_map(Op::Write),
        4 => (0usize..64).prop_map(Op::Read),
        2 => (0u64..8, any::<u8>()).prop_map(|(back_off, fraction)| Op::Seek { back_off, fraction }),
        1 => (0u64..1_000_000).prop_map(Op::Reset),
        1 => Just(Op::Peek),
    ]
}

/// Model of the three offsets; storage content is implied by `byte_at`
#[derive(Debug, Clone, Copy)]
struct Model {
    beg: u64,
    cur: u64,
    end: u64,
    capacity: u64,
    forward: u64,
}

impl Model {
    fn write(&mut self, len: usize) -> usize {
        let pos = self.end % self.capacity;
        let limit = self.forward.saturating_sub(self.end - self.cur);
        let wrap = self.capacity - pos;
        let accepted = (len as u64).min(limit).min(wrap);
        self.end += accepted;
        if self.end - self.beg > self.capacity {
            self.beg = self.end - self.capacity;
        }
        accepted as usize
    }

    fn read(&mut self, len: usize) -> usize {
        let pos = self.cur % self.capacity;
        let avail = (self.capacity - pos).min(self.end - self.cur);
        let n = (len as u64).min(avail);
        self.cur += n;
        n as usize
    }

    fn cursors(&self) -> Cursors {
        Cursors { beg: self.beg, cur: self.cur, end: self.end }
    }
}

fn check_invariants(cache: &CircularCache) -> Result<(), TestCaseError> {
    let c = cache.cursors();
    prop_assert!(c.beg <= c.cur, "beg {} > cur {}", c.beg, c.cur);
    prop_assert!(c.cur <= c.end, "cur {} > end {}", c.cur, c.end);
    prop_assert!(c.end - c.beg <= cache.capacity() as u64);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_operations_match_model(
        forward in 1usize..48,
        back in 0usize..24,
        ops in prop::collection::vec(op_strategy(), 1..200)
    ) {
        let cache = CircularCache::new(forward, back).unwrap();
        cache.open().unwrap();
        let mut model = Model {
            beg: 0,
            cur: 0,
            end: 0,
            capacity: (forward + back) as u64,
            forward: forward as u64,
        };

        for op in ops {
            match op {
                Op::Write(len) => {
                    let end = cache.cursors().end;
                    let data: Vec<u8> = (end..end + len as u64).map(byte_at).collect();
                    let accepted = cache.write(&data).unwrap();
                    prop_assert_eq!(accepted, model.write(len));
                }
                Op::Read(len) => {
                    let cur = cache.position();
                    let mut out = vec![0u8; len];
                    let expected = model.read(len);
                    match cache.read(&mut out).unwrap() {
                        ReadOutcome::Data(n) => {
                            prop_assert_eq!(n, expected);
                            for (i, &b) in out[..n].iter().enumerate() {
                                prop_assert_eq!(b, byte_at(cur + i as u64));
                            }
                        }
                        ReadOutcome::WouldBlock => prop_assert_eq!(expected, 0),
                        ReadOutcome::EndOfInput => prop_assert!(false, "end of input never set"),
                    }
                }
                Op::Seek { back_off, fraction } => {
                    let window = model.end - model.beg;
                    let target = (model.beg + window * fraction as u64 / 255).saturating_sub(back_off);
                    match cache.seek(SeekFrom::Start(target)) {
                        Ok(p) => {
                            prop_assert_eq!(p, target);
                            prop_assert!(target >= model.beg && target <= model.end);
                            model.cur = target;
                        }
                        Err(CacheError::SeekOutOfRange { position, .. }) => {
                            prop_assert_eq!(position, target);
                            prop_assert!(target < model.beg);
                        }
                        Err(e) => prop_assert!(false, "unexpected error {}", e),
                    }
                }
                Op::Reset(position) => {
                    cache.reset(position);
                    model.beg = position;
                    model.cur = position;
                    model.end = position;
                }
                Op::Peek => {
                    prop_assert_eq!(cache.wait_for_data(u64::MAX, Duration::ZERO), model.end - model.cur);
                }
            }

            prop_assert_eq!(cache.cursors(), model.cursors());
            check_invariants(&cache)?;
        }
    }

    /// A write crossing the physical end stops there; the remainder lands contiguously
    #[test]
    fn prop_wrap_split_is_contiguous(
        capacity in 2usize..64,
        prefix_seed in any::<usize>(),
        extra in 1usize..64
    ) {
        let cache = CircularCache::new(capacity, 0).unwrap();
        cache.open().unwrap();

        // move the write position to somewhere inside the ring
        let prefix = 1 + prefix_seed % (capacity - 1);
        let mut sink = vec![0u8; capacity];
        let head: Vec<u8> = (0..prefix as u64).map(byte_at).collect();
        prop_assert_eq!(cache.write(&head).unwrap(), prefix);
        prop_assert_eq!(cache.read(&mut sink).unwrap(), ReadOutcome::Data(prefix));

        let len = (capacity - prefix) + extra.min(prefix);
        let data: Vec<u8> = (prefix as u64..(prefix + len) as u64).map(byte_at).collect();

        let first = cache.write(&data).unwrap();
        prop_assert_eq!(first, capacity - prefix);
        let second = cache.write(&data[first..]).unwrap();
        prop_assert_eq!(first + second, len);

        let mut out = vec![0u8; len];
        let mut got = 0;
        while got < len {
            match cache.read(&mut out[got..]).unwrap() {
                ReadOutcome::Data(n) => got += n,
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }
        prop_assert_eq!(out, data);
    }

    /// Any position inside [beg, end] is reachable; anything before beg is not
    #[test]
    fn prop_seek_bounds(
        forward in 1usize..32,
        back in 0usize..32,
        rounds in 1usize..10
    ) {
        let cache = CircularCache::new(forward, back).unwrap();
        cache.open().unwrap();
        let mut sink = vec![0u8; forward + back];

        for _ in 0..rounds {
            let end = cache.cursors().end;
            let data: Vec<u8> = (end..end + forward as u64).map(byte_at).collect();
            cache.write(&data).unwrap();
            while let ReadOutcome::Data(n) = cache.read(&mut sink).unwrap() {
                prop_assert!(n > 0);
            }
        }

        let c = cache.cursors();
        for p in c.beg..=c.end {
            prop_assert_eq!(cache.seek(SeekFrom::Start(p)).unwrap(), p);
            prop_assert_eq!(cache.position(), p);
        }
        if c.beg > 0 {
            prop_assert!(cache.seek(SeekFrom::Start(c.beg - 1)).is_err());
        }
    }
}
