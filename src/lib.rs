//! A fixed size object pool allocator that carves page sized chunks of memory
//! into equally sized blocks.
//!
//! Each block can be wrapped in guard bytes, which are checked every time the
//! block is handed out or given back, and can carry one of several metadata
//! headers describing who allocated it and how often.
//!
//! ```rust
//! use pagepool::{HeaderScheme, PoolAllocator, PoolConfig};
//!
//! let config = PoolConfig::default()
//!     .with_pad_bytes(4)
//!     .with_header(HeaderScheme::Basic);
//! let mut pool = PoolAllocator::new(32, config).unwrap();
//!
//! let ptr = pool.allocate("node").unwrap();
//! assert_eq!(pool.stats().objects_in_use, 1);
//!
//! pool.free(ptr.as_ptr()).unwrap();
//! assert_eq!(pool.stats().objects_in_use, 0);
//! ```
//!
//! Writing past the end of an object is reported the next time the pool
//! touches that block.
//! ```rust
//! use pagepool::{CorruptionSite, PoolAllocator, PoolConfig, PoolError};
//!
//! let mut pool = PoolAllocator::new(8, PoolConfig::default().with_pad_bytes(2)).unwrap();
//! let ptr = pool.allocate("careless").unwrap();
//!
//! unsafe { ptr.as_ptr().add(8).write(0) };
//!
//! assert!(matches!(
//!     pool.free(ptr.as_ptr()),
//!     Err(PoolError::CorruptedBlock { site: CorruptionSite::AfterObject, .. })
//! ));
//! ```
mod config;
mod debug;
mod error;
mod handle;
mod metrics;
mod pool;

pub use config::{HeaderScheme, MemoryBackend, PoolConfig};
pub use error::{CorruptionSite, FreeFault, PoolError, PoolResult};
pub use handle::{PoolHandle, SharedPool};
pub use metrics::PoolStats;
pub use pool::{
    BasicHeader, BlockHeader, ExtendedHeader, ExternalRecord, NativeSource, PageSource,
    PoolAllocator, RawSource,
};
