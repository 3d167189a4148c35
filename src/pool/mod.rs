//! Size-classed slab pool for raw byte storage
//!
//! # Architecture
//!
//! ```text
//! SlabPool
//!   ├─→ SizeClass(64B)    → Free: [###, ###]
//!   ├─→ SizeClass(128B)   → Free: [###]
//!   ├─→ SizeClass(256B)   → Free: []
//!   ├─→ ...doubling...
//!   └─→ SizeClass(256KB)  → Free: [###]
//! ```
//!
//! `take(size)` rounds up to the owning size class and reuses a previously
//! released block when one is available; `give(storage)` returns a block to
//! the class whose capacity matches exactly. Requests above the largest
//! class bypass pooling and are satisfied by one-off allocations.
//!
//! A process-wide pool is exposed through [`get_bytes`]/[`put_bytes`];
//! buffers and pipes draw their backing storage from it.

pub mod size_class;
pub mod slab;
pub mod storage;

pub use slab::{get_bytes, put_bytes, BytesContainer, PoolStats, SizeClassStats, SlabPool};
pub use size_class::SizeClass;
pub use storage::Storage;
