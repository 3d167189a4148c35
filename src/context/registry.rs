//! Slot registration and per-slot object pools

use super::container::{ContainerSlots, PooledContext};
use parking_lot::Mutex;
use serde::Serialize;
use std::any::Any;
use std::marker::PhantomData;
use tracing::debug;

/// Upper bound on registered value kinds.
pub const MAX_SLOTS: usize = 16;

/// A registered value kind: how to construct a fresh value and how to
/// scrub one before it returns to its pool.
pub trait PoolKind: Send + Sync + 'static {
    type Value: Send + 'static;

    /// Construct a fresh value for an empty pool.
    fn create(&self) -> Self::Value;

    /// Scrub a value on its way back to the pool.
    fn reset(&self, value: &mut Self::Value);
}

/// Stable small integer identifying a registered kind (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot(pub(crate) usize);

impl Slot {
    /// The 1-based slot number.
    pub fn get(&self) -> usize {
        self.0
    }

    pub(crate) fn index(&self) -> usize {
        self.0 - 1
    }
}

/// Registration handle coupling a slot to its kind's value type.
///
/// Returned only by [`RegistryBuilder::register`], so holding one proves
/// the slot was registered for `K` — container lookups downcast on that
/// basis without a keyed check.
pub struct Registered<K: PoolKind> {
    pub(crate) slot: Slot,
    _kind: PhantomData<fn() -> K>,
}

impl<K: PoolKind> Registered<K> {
    pub fn slot(&self) -> Slot {
        self.slot
    }
}

impl<K: PoolKind> Clone for Registered<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: PoolKind> Copy for Registered<K> {}

/// Object pool for one slot, erased so the registry can hold a mixed set.
pub(crate) trait AnyPool: Send + Sync {
    fn checkout(&self) -> Box<dyn Any + Send>;
    fn restore(&self, value: Box<dyn Any + Send>);
    fn free_count(&self) -> usize;
}

struct TypedPool<K: PoolKind> {
    kind: K,
    free: Mutex<Vec<K::Value>>,
}

impl<K: PoolKind> AnyPool for TypedPool<K> {
    fn checkout(&self) -> Box<dyn Any + Send> {
        let value = self
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| self.kind.create());
        Box::new(value)
    }

    fn restore(&self, value: Box<dyn Any + Send>) {
        // The container only routes values back to the slot they were
        // checked out of, so a mismatch here is a wiring defect.
        let mut value = value
            .downcast::<K::Value>()
            .expect("value returned to a slot of a different kind");
        self.kind.reset(&mut value);
        self.free.lock().push(*value);
    }

    fn free_count(&self) -> usize {
        self.free.lock().len()
    }
}

/// Static-phase registration. Consumed by `freeze` once every kind is
/// registered; registration after that point is unrepresentable.
#[derive(Default)]
pub struct RegistryBuilder {
    pools: Vec<Box<dyn AnyPool>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next slot (starting at 1) to `kind`.
    ///
    /// Panics when the slot table is full: exceeding [`MAX_SLOTS`] is a
    /// static wiring defect with no runtime fallback.
    pub fn register<K: PoolKind>(&mut self, kind: K) -> Registered<K> {
        assert!(
            self.pools.len() < MAX_SLOTS,
            "pool slots over full ({MAX_SLOTS} max)"
        );
        self.pools.push(Box::new(TypedPool {
            kind,
            free: Mutex::new(Vec::new()),
        }));
        let slot = Slot(self.pools.len());
        debug!(slot = slot.get(), "registered pool kind");
        Registered {
            slot,
            _kind: PhantomData,
        }
    }

    /// Freeze the slot table into a shareable registry.
    pub fn freeze(self) -> Registry {
        Registry {
            pools: self.pools,
            containers: Mutex::new(Vec::new()),
        }
    }
}

/// Frozen slot table plus the recycled-container pool.
///
/// Constructed once at startup and passed by reference to dynamic-phase
/// code; per-slot pools support concurrent checkout/return from many
/// owners with no ordering guarantee.
pub struct Registry {
    pools: Vec<Box<dyn AnyPool>>,
    containers: Mutex<Vec<Box<ContainerSlots>>>,
}

impl Registry {
    /// Obtain a per-owner container for a new unit of work, recycling a
    /// previously released one when available.
    pub fn attach(&self) -> PooledContext<'_> {
        let slots = self
            .containers
            .lock()
            .pop()
            .unwrap_or_else(|| Box::new(ContainerSlots::new()));
        PooledContext::new(self, slots)
    }

    /// Number of registered slots.
    pub fn slot_count(&self) -> usize {
        self.pools.len()
    }

    pub(crate) fn pool(&self, index: usize) -> &dyn AnyPool {
        assert!(
            index < self.pools.len(),
            "slot {} outside the registered range (1..={})",
            index + 1,
            self.pools.len()
        );
        self.pools[index].as_ref()
    }

    pub(crate) fn recycle(&self, slots: Box<ContainerSlots>) {
        self.containers.lock().push(slots);
    }

    /// Snapshot of per-slot pool occupancy.
    pub fn stats(&self) -> Vec<SlotStats> {
        self.pools
            .iter()
            .enumerate()
            .map(|(i, pool)| SlotStats {
                slot: i + 1,
                free_values: pool.free_count(),
            })
            .collect()
    }
}

/// Per-slot pool statistics
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SlotStats {
    pub slot: usize,
    pub free_values: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScratchKind;

    impl PoolKind for ScratchKind {
        type Value = Vec<u8>;

        fn create(&self) -> Vec<u8> {
            Vec::with_capacity(32)
        }

        fn reset(&self, value: &mut Vec<u8>) {
            value.clear();
        }
    }

    #[test]
    fn test_slots_assigned_from_one() {
        let mut builder = RegistryBuilder::new();
        let first = builder.register(ScratchKind);
        let second = builder.register(ScratchKind);

        assert_eq!(first.slot().get(), 1);
        assert_eq!(second.slot().get(), 2);
        assert_eq!(builder.freeze().slot_count(), 2);
    }

    #[test]
    #[should_panic(expected = "over full")]
    fn test_register_beyond_max_slots() {
        let mut builder = RegistryBuilder::new();
        for _ in 0..=MAX_SLOTS {
            builder.register(ScratchKind);
        }
    }

    #[test]
    fn test_checkout_constructs_then_reuses() {
        let mut builder = RegistryBuilder::new();
        let handle = builder.register(ScratchKind);
        let registry = builder.freeze();

        let pool = registry.pool(handle.slot().index());
        assert_eq!(pool.free_count(), 0);

        let mut value = pool.checkout();
        value
            .downcast_mut::<Vec<u8>>()
            .unwrap()
            .extend_from_slice(b"dirty");
        pool.restore(value);
        assert_eq!(pool.free_count(), 1);

        // Reused value comes back scrubbed by the kind's reset.
        let value = pool.checkout();
        assert!(value.downcast_ref::<Vec<u8>>().unwrap().is_empty());
        assert_eq!(pool.free_count(), 0);

        let stats = registry.stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].slot, 1);
        assert_eq!(stats[0].free_values, 0);
    }
}
