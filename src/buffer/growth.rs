//! Growth and compaction policy
//!
//! Kept as pure functions so the arithmetic is unit-testable independent
//! of buffer I/O behavior.

/// Minimum spare tail kept ahead of a reader pull (bytes).
pub const MIN_READ: usize = 1 << 9;
/// Largest single reader pull the buffer plans for.
pub const MAX_READ: usize = 1 << 17;
/// Backing size used when `alloc` is asked for zero bytes.
pub const DEFAULT_SIZE: usize = 1 << 4;
/// A fully drained buffer above this capacity is reclaimed by `read_once`.
pub const MAX_BUFFER_LENGTH: usize = 1 << 20;
/// Above this capacity growth switches from doubling to +25% steps.
pub const MAX_THRESHOLD: usize = 1 << 22;

/// One step of the growth curve.
///
/// Doubles while the buffer is small (bounding the number of copies), then
/// grows by a quarter once past [`MAX_THRESHOLD`] (bounding peak memory
/// overhead on large buffers).
pub fn next_capacity(old: usize) -> usize {
    if old < 2 * MIN_READ {
        2 * MIN_READ
    } else if old < MAX_THRESHOLD {
        2 * old
    } else {
        old + old / 4
    }
}

/// Smallest capacity on the growth curve that fits `need` bytes.
pub fn grow_capacity(old: usize, need: usize) -> usize {
    let mut capacity = next_capacity(old);
    while capacity < need {
        capacity = next_capacity(capacity);
    }
    capacity
}

/// Whether shifting live bytes to offset 0 is enough, instead of
/// reallocating: unread plus requested bytes must fit within half the
/// current capacity, leaving room to keep writing after the shift.
pub fn should_compact(unread: usize, requested: usize, capacity: usize) -> bool {
    unread + requested <= capacity / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_capacity_small_floors_at_min_read() {
        assert_eq!(next_capacity(0), 2 * MIN_READ);
        assert_eq!(next_capacity(16), 2 * MIN_READ);
        assert_eq!(next_capacity(2 * MIN_READ - 1), 2 * MIN_READ);
    }

    #[test]
    fn test_next_capacity_doubles_below_threshold() {
        assert_eq!(next_capacity(1024), 2048);
        assert_eq!(next_capacity(1 << 20), 1 << 21);
        assert_eq!(next_capacity(MAX_THRESHOLD - 1), 2 * (MAX_THRESHOLD - 1));
    }

    #[test]
    fn test_next_capacity_linear_above_threshold() {
        assert_eq!(next_capacity(MAX_THRESHOLD), MAX_THRESHOLD + MAX_THRESHOLD / 4);
        let big = 8 << 20;
        assert_eq!(next_capacity(big), big + big / 4);
    }

    #[test]
    fn test_grow_capacity_fits_need() {
        assert_eq!(grow_capacity(1024, 1500), 2048);
        assert_eq!(grow_capacity(1024, 5000), 8192);
        assert!(grow_capacity(MAX_THRESHOLD, 3 * MAX_THRESHOLD) >= 3 * MAX_THRESHOLD);
    }

    #[test]
    fn test_should_compact_boundary() {
        // 100 unread + 28 requested == half of 256
        assert!(should_compact(100, 28, 256));
        assert!(!should_compact(100, 29, 256));
        assert!(should_compact(0, 0, 0));
    }
}
