//! Backing storage for the cache
//!
//! ## Allocation Strategies
//!
//! - `HeapStore` - Standard heap allocation
//! - `MappedStore` - Anonymous memory map, optionally locked with mlock
//!
//! The cache only sees a `BackingStore`; which one was picked has no effect on
//! cache behavior.

use memmap2::{ MmapMut, MmapOptions };
use serde::{ Deserialize, Serialize };

use crate::error::{ CacheError, Result };

/// Where the cache bytes live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackingKind {
    /// Boxed heap slice
    #[default]
    Heap,
    /// Anonymous mmap region
    Mapped,
}

impl BackingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackingKind::Heap => "heap",
            BackingKind::Mapped => "mapped",
        }
    }
}

/// Fixed-size, exclusively owned byte storage
pub trait BackingStore: Send + Sync {
    fn as_slice(&self) -> &[u8];

    fn as_mut_slice(&mut self) -> &mut [u8];

    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind(&self) -> BackingKind;
}

/// Heap-allocated storage
pub struct HeapStore {
    buffer: Box<[u8]>,
}

impl HeapStore {
    /// Allocate `len` zeroed bytes, reporting failure instead of aborting
    pub fn allocate(len: usize) -> Result<Self> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|e| CacheError::allocation(format!("heap reserve of {} bytes: {}", len, e)))?;
        buffer.resize(len, 0u8);

        Ok(Self {
            buffer: buffer.into_boxed_slice(),
        })
    }
}

impl BackingStore for HeapStore {
    #[inline(always)]
    fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    #[inline(always)]
    fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    fn kind(&self) -> BackingKind {
        BackingKind::Heap
    }
}

/// Memory-mapped storage (anonymous, private to the process)
pub struct MappedStore {
    map: MmapMut,
}

impl MappedStore {
    /// Map `len` bytes; with `lock` the pages are pinned to prevent swapping
    pub fn allocate(len: usize, lock: bool) -> Result<Self> {
        if len == 0 {
            return Err(CacheError::allocation("cannot map an empty region"));
        }

        let map = MmapOptions::new()
            .len(len)
            .map_anon()
            .map_err(|e| CacheError::allocation(format!("mmap of {} bytes: {}", len, e)))?;

        if lock {
            lock_pages(&map);
        }

        Ok(Self { map })
    }
}

// mlock failure is ignored
#[cfg(unix)]
fn lock_pages(map: &MmapMut) {
    unsafe {
        let _ = libc::mlock(map.as_ptr() as *const libc::c_void, map.len());
    }
}

#[cfg(not(unix))]
fn lock_pages(_map: &MmapMut) {}

impl BackingStore for MappedStore {
    #[inline(always)]
    fn as_slice(&self) -> &[u8] {
        &self.map
    }

    #[inline(always)]
    fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.map
    }

    fn kind(&self) -> BackingKind {
        BackingKind::Mapped
    }
}

/// Allocate `len` bytes with the requested strategy
pub fn allocate(kind: BackingKind, len: usize, lock_memory: bool) -> Result<Box<dyn BackingStore>> {
    match kind {
        BackingKind::Heap => Ok(Box::new(HeapStore::allocate(len)?)),
        BackingKind::Mapped => Ok(Box::new(MappedStore::allocate(len, lock_memory)?)),
    }
}
