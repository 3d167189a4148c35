//! Per-unit-of-work pooled values keyed by stable integer slot
//!
//! Value kinds are registered once at startup through a
//! [`RegistryBuilder`], each receiving a small integer slot; the frozen
//! [`Registry`] then hands out recycled [`PooledContext`] containers that
//! cache at most one checked-out value per slot and return all of them to
//! their pools in one release. Lookups are O(1) array indexing, never a
//! keyed map.

pub mod container;
pub mod registry;

pub use container::PooledContext;
pub use registry::{PoolKind, Registered, Registry, RegistryBuilder, Slot, SlotStats, MAX_SLOTS};
