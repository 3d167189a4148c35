//! Size class management for the slab pool

use parking_lot::Mutex;

/// Upper bound on idle blocks retained per class.
///
/// A full free list drops returned blocks instead of growing without
/// bound; `take` then falls back to a fresh allocation. This stands in
/// for a reclaiming memory manager evicting idle pool entries.
pub(crate) const MAX_FREE_PER_CLASS: usize = 64;

/// One rung of the allocation ladder: a fixed block size plus a free list
/// of previously released blocks of exactly that capacity.
pub struct SizeClass {
    /// Capacity of every block in this class (power of two)
    default_size: usize,
    /// Released blocks awaiting reuse
    free: Mutex<Vec<Box<[u8]>>>,
}

impl SizeClass {
    pub fn new(default_size: usize) -> Self {
        Self {
            default_size,
            free: Mutex::new(Vec::new()),
        }
    }

    pub fn default_size(&self) -> usize {
        self.default_size
    }

    /// Pop a free block, if any. Callers allocate on `None`.
    pub fn take(&self) -> Option<Box<[u8]>> {
        self.free.lock().pop()
    }

    /// Return a block to the free list.
    ///
    /// The block's length must equal `default_size`; mismatches are the
    /// caller's responsibility to filter (see `SlabPool::give`). Drops the
    /// block when the list is at capacity.
    pub fn give(&self, block: Box<[u8]>) {
        debug_assert_eq!(block.len(), self.default_size);
        let mut free = self.free.lock();
        if free.len() < MAX_FREE_PER_CLASS {
            free.push(block);
        }
    }

    /// Number of idle blocks currently pooled.
    pub fn free_count(&self) -> usize {
        self.free.lock().len()
    }
}
