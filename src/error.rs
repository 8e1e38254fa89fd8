use thiserror::Error;

/// Which guard zone of a block was found overwritten.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CorruptionSite {
    /// The pad bytes between the header and the object.
    BeforeObject,
    /// The pad bytes following the object.
    AfterObject,
    /// The free list link stored in a free block's object bytes, which
    /// means the block was written to after it was freed.
    FreeLink,
}

impl std::fmt::Display for CorruptionSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorruptionSite::BeforeObject => write!(f, "before"),
            CorruptionSite::AfterObject => write!(f, "after"),
            CorruptionSite::FreeLink => write!(f, "inside"),
        }
    }
}

/// Why a call to `free` was rejected.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FreeFault {
    NullPointer,
    /// No object is currently handed out by the allocator.
    NothingInUse,
    /// The address is not inside any page owned by the allocator.
    ForeignPointer,
    /// The address is inside a page but not on the first byte of an object.
    NotOnBoundary,
    /// The block is already sitting in the free list.
    NotAllocated,
}

impl std::fmt::Display for FreeFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            FreeFault::NullPointer => "null pointer",
            FreeFault::NothingInUse => "no objects are in use",
            FreeFault::ForeignPointer => "pointer is not owned by this pool",
            FreeFault::NotOnBoundary => "pointer is not on a block boundary",
            FreeFault::NotAllocated => "block is not allocated",
        };

        write!(f, "{reason}")
    }
}

/// Errors returned by the pool allocator.
///
/// Every error is reported before any statistic is updated, so a failed
/// `allocate` or `free` leaves the pool exactly as it was (a page acquired
/// on the way to a failing allocation stays acquired).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The memory backend could not supply a page.
    #[error("out of memory: backend failed to supply a page of {bytes} bytes")]
    OutOfMemory { bytes: usize },

    /// Every page the configuration allows is already in use.
    #[error("page limit exceeded: {max_pages} pages already allocated")]
    PageLimitExceeded { max_pages: usize },

    /// Guard bytes around a block did not hold the pad pattern.
    #[error("corrupted block at {address:#x}: memory overwritten {site} the object")]
    CorruptedBlock { site: CorruptionSite, address: usize },

    #[error("invalid free: {0}")]
    InvalidFree(FreeFault),

    /// The handle has no allocator behind it.
    #[error("allocator not configured")]
    NotConfigured,

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("could not parse configuration: {0}")]
    ConfigParse(String),
}

pub type PoolResult<T> = Result<T, PoolError>;
