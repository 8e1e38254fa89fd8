use crate::error::{PoolError, PoolResult};
use crate::metrics::PoolStats;
use crate::pool::PoolAllocator;
use std::cell::RefCell;
use std::ptr::NonNull;
use std::rc::Rc;

/// An allocator several structures on one thread allocate from.
pub type SharedPool = Rc<RefCell<PoolAllocator>>;

/// How a data structure reaches the allocator backing its nodes.
///
/// A structure either owns its pool outright, borrows one that other
/// structures use too, or has none at all yet.
#[derive(Default)]
pub enum PoolHandle {
    Owned(PoolAllocator),
    Shared(SharedPool),
    #[default]
    Detached,
}

impl PoolHandle {
    pub fn owned(pool: PoolAllocator) -> Self {
        PoolHandle::Owned(pool)
    }

    pub fn shared(pool: &SharedPool) -> Self {
        PoolHandle::Shared(Rc::clone(pool))
    }

    pub fn is_detached(&self) -> bool {
        matches!(self, PoolHandle::Detached)
    }

    pub fn allocate(&mut self, label: &str) -> PoolResult<NonNull<u8>> {
        match self {
            PoolHandle::Owned(pool) => pool.allocate(label),
            PoolHandle::Shared(pool) => pool.borrow_mut().allocate(label),
            PoolHandle::Detached => Err(PoolError::NotConfigured),
        }
    }

    pub fn free(&mut self, ptr: *mut u8) -> PoolResult<()> {
        match self {
            PoolHandle::Owned(pool) => pool.free(ptr),
            PoolHandle::Shared(pool) => pool.borrow_mut().free(ptr),
            PoolHandle::Detached => Err(PoolError::NotConfigured),
        }
    }

    pub fn stats(&self) -> PoolResult<PoolStats> {
        match self {
            PoolHandle::Owned(pool) => Ok(pool.stats()),
            PoolHandle::Shared(pool) => Ok(pool.borrow().stats()),
            PoolHandle::Detached => Err(PoolError::NotConfigured),
        }
    }

    /// Detaches the handle. An owned pool is torn down here, along with
    /// every object still allocated from it; a shared pool only loses this
    /// reference.
    pub fn release(&mut self) {
        match std::mem::take(self) {
            PoolHandle::Owned(pool) => drop(pool),
            PoolHandle::Shared(pool) => {
                log::debug!(
                    "[pagepool] handle released, {} other owners remain",
                    Rc::strong_count(&pool) - 1
                );
            }
            PoolHandle::Detached => {}
        }
    }
}

impl From<PoolAllocator> for PoolHandle {
    fn from(pool: PoolAllocator) -> Self {
        PoolHandle::Owned(pool)
    }
}
