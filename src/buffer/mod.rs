//! Growable buffer over pooled storage
//!
//! [`IoBuffer`] keeps logical read/write cursors over one slab-pool-owned
//! allocation and grows by reslicing, compacting, or reallocating through
//! the pool. Growth policy lives in [`growth`] as pure functions.

pub mod growth;
pub mod io_buffer;

pub use growth::{DEFAULT_SIZE, MAX_BUFFER_LENGTH, MAX_READ, MAX_THRESHOLD, MIN_READ};
pub use io_buffer::IoBuffer;
