// bufpool - pooled byte buffers for I/O pipelines
// Size-classed slab pool, growable buffer, context registry, blocking pipe

#![warn(rust_2018_idioms)]

pub mod buffer;
pub mod context;
pub mod pipe;
pub mod pool;

// Re-exports for convenience
pub use buffer::IoBuffer;
pub use context::{PoolKind, PooledContext, Registered, Registry, RegistryBuilder};
pub use pipe::Pipe;
pub use pool::{get_bytes, put_bytes, BytesContainer, SlabPool, Storage};

/// bufpool error types
pub mod error {
    use thiserror::Error;

    /// Errors surfaced by buffers and pipes.
    ///
    /// Payloads are plain strings so the enum stays `Clone`: a pipe stores
    /// its terminal error once and replays it to every drained reader.
    /// Static wiring defects (slot overflow, unregistered slots) panic
    /// instead of appearing here.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum Error {
        #[error("EOF")]
        Eof,

        #[error("io buffer: too large")]
        TooLarge,

        #[error("io buffer: invalid write count")]
        InvalidWriteCount,

        #[error("write on closed buffer")]
        ClosedPipeWrite,

        #[error("pipe closed: {0}")]
        Closed(String),

        #[error("io error: {0}")]
        Io(String),
    }

    impl From<std::io::Error> for Error {
        fn from(e: std::io::Error) -> Self {
            Error::Io(e.to_string())
        }
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
