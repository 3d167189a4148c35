//! Slab pool implementation

use super::size_class::SizeClass;
use super::storage::Storage;
use lazy_static::lazy_static;
use serde::Serialize;
use tracing::{debug, trace};

/// Smallest class is `1 << MIN_SHIFT` = 64 bytes.
const MIN_SHIFT: u32 = 6;
/// Largest class is `1 << MAX_SHIFT` = 256 KiB; larger requests bypass
/// pooling entirely.
const MAX_SHIFT: u32 = 18;

lazy_static! {
    static ref BYTE_POOL: SlabPool = SlabPool::new();
}

/// Size-classed pool of raw byte storage.
///
/// Owns a fixed ladder of [`SizeClass`]es doubling from 64 bytes to
/// 256 KiB. Created once as process-wide state (see [`get_bytes`] /
/// [`put_bytes`]) and never destroyed; per-class free lists support
/// concurrent checkout/return with no ordering guarantee.
pub struct SlabPool {
    min_size: usize,
    max_size: usize,
    classes: Vec<SizeClass>,
}

impl SlabPool {
    /// Build the full ladder of size classes.
    pub fn new() -> Self {
        let mut classes = Vec::with_capacity((MAX_SHIFT - MIN_SHIFT + 1) as usize);
        for shift in MIN_SHIFT..=MAX_SHIFT {
            classes.push(SizeClass::new(1 << shift));
        }
        debug!(
            classes = classes.len(),
            min = 1usize << MIN_SHIFT,
            max = 1usize << MAX_SHIFT,
            "initialized slab pool"
        );
        Self {
            min_size: 1 << MIN_SHIFT,
            max_size: 1 << MAX_SHIFT,
            classes,
        }
    }

    /// The process-wide pool backing [`get_bytes`]/[`put_bytes`].
    pub fn global() -> &'static SlabPool {
        &BYTE_POOL
    }

    /// Index of the class owning `size`, or `None` when `size` exceeds the
    /// largest class and must bypass pooling.
    ///
    /// Classes double, so the owning slot is `ceil(log2(size))` shifted
    /// down by the minimum: sizes 1..=64 map to slot 0, 65..=128 to
    /// slot 1, and so on.
    fn slot(&self, size: usize) -> Option<usize> {
        if size > self.max_size {
            return None;
        }
        if size <= self.min_size {
            return Some(0);
        }
        let ceil_log2 = (usize::BITS - (size - 1).leading_zeros()) as usize;
        Some(ceil_log2 - MIN_SHIFT as usize)
    }

    /// Check out storage for `size` bytes.
    ///
    /// Oversized requests get a fresh unpooled block of exactly `size`
    /// bytes. Otherwise the owning class is consulted: a pooled block is
    /// reused when available, a fresh one of the class's default size is
    /// allocated when not. Either way the returned storage has logical
    /// length `size`.
    pub fn take(&self, size: usize) -> Storage {
        match self.slot(size) {
            None => {
                trace!(size, "oversized request bypasses pool");
                Storage::with_capacity(size, size)
            }
            Some(slot) => {
                let class = &self.classes[slot];
                match class.take() {
                    Some(block) => Storage::from_raw(block, size),
                    None => Storage::with_capacity(class.default_size(), size),
                }
            }
        }
    }

    /// Return storage to the pool.
    ///
    /// The block goes back to the class whose default size equals its
    /// capacity exactly. Anything else (including unpooled oversized
    /// blocks) is dropped silently so a class never holds a
    /// mismatched-capacity block.
    pub fn give(&self, storage: Storage) {
        let capacity = storage.capacity();
        if let Some(slot) = self.slot(capacity) {
            let class = &self.classes[slot];
            if class.default_size() == capacity {
                class.give(storage.into_raw());
                return;
            }
        }
        trace!(capacity, "discarding block with no matching size class");
    }

    /// Snapshot of per-class pool occupancy.
    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats::default();
        for class in &self.classes {
            stats.size_classes.push(SizeClassStats {
                default_size: class.default_size(),
                free_blocks: class.free_count(),
            });
            stats.pooled_bytes += class.default_size() * class.free_count();
        }
        stats
    }
}

impl Default for SlabPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Check out pooled storage from the process-wide pool.
pub fn get_bytes(size: usize) -> Storage {
    BYTE_POOL.take(size)
}

/// Return storage to the process-wide pool.
pub fn put_bytes(storage: Storage) {
    BYTE_POOL.give(storage)
}

/// Per-scope container over the process-wide pool.
///
/// Tracks every block it checks out and returns them all in one `reset`,
/// so request-scoped code can take scratch buffers freely and release them
/// at a single point. Dropping the container resets it.
#[derive(Default)]
pub struct BytesContainer {
    bufs: Vec<Storage>,
}

impl BytesContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check out a block of `size` bytes, retained until `reset`.
    pub fn take(&mut self, size: usize) -> &mut Storage {
        self.bufs.push(get_bytes(size));
        self.bufs.last_mut().unwrap()
    }

    /// Return every held block to the pool.
    pub fn reset(&mut self) {
        for buf in self.bufs.drain(..) {
            put_bytes(buf);
        }
    }

    /// Number of blocks currently held.
    pub fn len(&self) -> usize {
        self.bufs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bufs.is_empty()
    }
}

impl Drop for BytesContainer {
    fn drop(&mut self) {
        self.reset();
    }
}

/// Pool occupancy statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct PoolStats {
    pub size_classes: Vec<SizeClassStats>,
    pub pooled_bytes: usize,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SizeClassStats {
    pub default_size: usize,
    pub free_blocks: usize,
}
