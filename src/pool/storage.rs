//! Raw byte storage checked out of the slab pool

use std::fmt;
use std::ops::{Deref, DerefMut};

/// A fixed-capacity byte block with a logical length.
///
/// The backing is a `Box<[u8]>`, so `capacity()` is exact by construction
/// and never rounded up by the allocator. Pooling relies on that: a block
/// is only returned to the size class whose `default_size` equals its
/// capacity, so capacities must compare exactly.
///
/// The logical length marks how much of the block is in use. Slices from
/// `as_slice`/`Deref` cover `[0, len)`; `spare_mut` exposes the unused
/// tail `[len, capacity)`.
pub struct Storage {
    data: Box<[u8]>,
    len: usize,
}

impl Storage {
    /// Allocate a zeroed block of exactly `capacity` bytes with the given
    /// logical length.
    pub fn with_capacity(capacity: usize, len: usize) -> Self {
        debug_assert!(len <= capacity);
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            len,
        }
    }

    /// Rewrap a bare block coming back out of a size-class free list.
    pub(crate) fn from_raw(data: Box<[u8]>, len: usize) -> Self {
        debug_assert!(len <= data.len());
        Self { data, len }
    }

    /// Unwrap the bare block for the free list, discarding the length.
    pub(crate) fn into_raw(self) -> Box<[u8]> {
        self.data
    }

    /// Exact capacity of the block in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Logical length (bytes in use).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Set the logical length.
    ///
    /// Panics if `len` exceeds the capacity; that is a cursor arithmetic
    /// defect in the caller, not a runtime condition.
    pub fn set_len(&mut self, len: usize) {
        assert!(
            len <= self.data.len(),
            "storage length {} exceeds capacity {}",
            len,
            self.data.len()
        );
        self.len = len;
    }

    /// The in-use prefix `[0, len)`.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Mutable view of the in-use prefix.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }

    /// Mutable view of the unused tail `[len, capacity)`.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.len..]
    }

    /// Mutable view of the whole block regardless of logical length.
    pub(crate) fn raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Deref for Storage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl DerefMut for Storage {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("len", &self.len)
            .field("capacity", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_exact_capacity() {
        let s = Storage::with_capacity(100, 40);
        assert_eq!(s.capacity(), 100);
        assert_eq!(s.len(), 40);
        assert_eq!(s.as_slice().len(), 40);
    }

    #[test]
    fn test_storage_set_len_and_spare() {
        let mut s = Storage::with_capacity(64, 0);
        assert!(s.is_empty());
        assert_eq!(s.spare_mut().len(), 64);

        s.spare_mut()[..3].copy_from_slice(b"abc");
        s.set_len(3);
        assert_eq!(&s[..], b"abc");
        assert_eq!(s.spare_mut().len(), 61);
    }

    #[test]
    #[should_panic(expected = "exceeds capacity")]
    fn test_storage_set_len_beyond_capacity() {
        let mut s = Storage::with_capacity(8, 0);
        s.set_len(9);
    }
}
