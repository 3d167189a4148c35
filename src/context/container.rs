//! Per-owner container of checked-out pooled values

use super::registry::{PoolKind, Registered, Registry, MAX_SLOTS};
use std::any::Any;

type SlotValue = Option<Box<dyn Any + Send>>;

/// The recyclable slot arrays behind a [`PooledContext`].
///
/// Boxed so the registry's container pool can hand the same heap block to
/// successive units of work.
pub(crate) struct ContainerSlots {
    /// Values checked out locally, one per slot
    values: [SlotValue; MAX_SLOTS],
    /// Values handed over from another owner
    transmit: [SlotValue; MAX_SLOTS],
}

impl ContainerSlots {
    pub(crate) fn new() -> Self {
        Self {
            values: std::array::from_fn(|_| None),
            transmit: std::array::from_fn(|_| None),
        }
    }
}

/// Per-unit-of-work container caching at most one pooled value per slot.
///
/// Obtained from [`Registry::attach`]; mutated only by its owning unit of
/// work. Releasing consumes the container — `release(self)` or plain drop
/// — so a double release is unrepresentable. On release every non-nil
/// value in both arrays goes back to its slot's pool (scrubbed by the
/// kind's `reset`) and the container itself returns to the registry's
/// container pool.
pub struct PooledContext<'r> {
    registry: &'r Registry,
    slots: Option<Box<ContainerSlots>>,
}

impl<'r> PooledContext<'r> {
    pub(crate) fn new(registry: &'r Registry, slots: Box<ContainerSlots>) -> Self {
        Self {
            registry,
            slots: Some(slots),
        }
    }

    /// The cached value for `handle`'s slot, checking a fresh one out of
    /// the slot's pool on first use.
    ///
    /// Panics if the slot lies outside this registry's registered range —
    /// a handle from a different registry is a static wiring defect.
    pub fn get_or_create<K: PoolKind>(&mut self, handle: Registered<K>) -> &mut K::Value {
        let index = handle.slot.index();
        let pool = self.registry.pool(index);
        let slots = self.slots.as_mut().unwrap();
        if slots.values[index].is_none() {
            slots.values[index] = Some(pool.checkout());
        }
        slots.values[index]
            .as_mut()
            .unwrap()
            .downcast_mut::<K::Value>()
            .expect("slot value bound to a different kind")
    }

    /// Whether this container holds a value at `handle`'s slot.
    pub fn holds<K: PoolKind>(&self, handle: Registered<K>) -> bool {
        self.slots.as_ref().unwrap().values[handle.slot.index()].is_some()
    }

    /// Move every value cached in `src` into this container's transmit
    /// array, handing them across an owner boundary without a pool
    /// round-trip. Both containers must come from the same registry.
    pub fn transmit_from(&mut self, src: &mut PooledContext<'_>) {
        assert!(
            std::ptr::eq(self.registry, src.registry),
            "transmit between containers of different registries"
        );
        let dst_slots = self.slots.as_mut().unwrap();
        let src_slots = src.slots.as_mut().unwrap();
        for index in 0..self.registry.slot_count() {
            if let Some(value) = src_slots.values[index].take() {
                // an earlier hand-off at the same slot goes back to its pool
                if let Some(prior) = dst_slots.transmit[index].replace(value) {
                    self.registry.pool(index).restore(prior);
                }
            }
        }
    }

    /// Release the container: every held value returns to its slot's pool
    /// and the container recycles. Equivalent to dropping it.
    pub fn release(self) {}
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        let mut slots = match self.slots.take() {
            Some(slots) => slots,
            None => return,
        };
        for index in 0..self.registry.slot_count() {
            if let Some(value) = slots.values[index].take() {
                self.registry.pool(index).restore(value);
            }
            if let Some(value) = slots.transmit[index].take() {
                self.registry.pool(index).restore(value);
            }
        }
        self.registry.recycle(slots);
    }
}
