use super::backend::PageSource;
use super::constants::ALLOCATED_PATTERN;
use super::free_list::{locate, BlockRef, FreeList};
use super::guard;
use super::header::{BlockHeader, ExternalRecord};
use super::layout::PoolLayout;
use super::page::{BlockState, Page};
use crate::config::{HeaderScheme, PoolConfig};
use crate::error::{FreeFault, PoolError, PoolResult};
use crate::metrics::PoolStats;
use std::ptr::NonNull;
use std::rc::Rc;

/// A pool of fixed size objects carved out of pages.
///
/// Every object handed out by [`PoolAllocator::allocate`] is `object_size`
/// bytes long and stays valid until it is passed to [`PoolAllocator::free`]
/// or the pool is dropped. Blocks are reused last-in first-out.
///
/// The pool is single threaded: it hands out raw pointers and keeps no
/// locks, so it is neither `Send` nor `Sync`.
///
/// ```
/// use pagepool::{PoolAllocator, PoolConfig};
///
/// let mut pool = PoolAllocator::new(16, PoolConfig::default()).unwrap();
/// let a = pool.allocate("a").unwrap();
///
/// pool.free(a.as_ptr()).unwrap();
///
/// assert_eq!(pool.allocate("b").unwrap(), a);
/// ```
pub struct PoolAllocator {
    config: PoolConfig,
    layout: PoolLayout,
    source: Rc<dyn PageSource>,
    // oldest first, so a BlockRef's page index never moves
    pages: Vec<Page>,
    free_list: FreeList,
    stats: PoolStats,
}

impl PoolAllocator {
    /// Builds a pool for objects of `object_size` bytes and acquires its
    /// first page from the configured backend.
    pub fn new(object_size: usize, config: PoolConfig) -> PoolResult<Self> {
        Self::with_source(object_size, config, config.backend.source())
    }

    /// Like [`PoolAllocator::new`], with pages coming from `source` instead
    /// of the configured backend.
    pub fn with_source(
        object_size: usize,
        config: PoolConfig,
        source: Rc<dyn PageSource>,
    ) -> PoolResult<Self> {
        let layout = PoolLayout::new(object_size, &config)?;
        let mut pool = Self {
            config,
            layout,
            source,
            pages: Vec::with_capacity(config.max_pages),
            free_list: FreeList::new(),
            stats: PoolStats::new(object_size, layout.block_size, layout.page_size),
        };

        pool.acquire_page()?;

        Ok(pool)
    }

    fn acquire_page(&mut self) -> PoolResult<BlockRef> {
        if self.pages.len() >= self.config.max_pages {
            log::warn!(
                "[pagepool] page limit reached: {} of {} pages in use",
                self.pages.len(),
                self.config.max_pages
            );

            return Err(PoolError::PageLimitExceeded {
                max_pages: self.config.max_pages,
            });
        }

        let page = Page::new(self.source.clone(), self.layout).map_err(|err| {
            log::warn!("[pagepool] backend refused a page of {} bytes", self.layout.page_size);
            err
        })?;

        log::debug!(
            "[pagepool] new page {:#x} size={} objects={}",
            page.base(),
            self.layout.page_size,
            self.layout.objects_per_page
        );

        let index = self.pages.len();

        self.pages.push(page);
        self.stats.record_page(self.layout.objects_per_page);

        Ok(self.free_list.seed(&mut self.pages, index))
    }

    /// Hands out one object.
    ///
    /// `label` names the owner; only [`HeaderScheme::External`] keeps it.
    pub fn allocate(&mut self, label: &str) -> PoolResult<NonNull<u8>> {
        let block = match self.free_list.head() {
            Some(head) => head,
            None => self.acquire_page()?,
        };

        guard::check(&self.pages[block.page], block.index)?;
        // unlinks `block`, or fails leaving the list as it was
        self.free_list.pop(&self.pages)?;

        let alloc_num = (self.stats.allocations + 1) as u32;
        let scheme = self.config.header;
        let page = &mut self.pages[block.page];
        let (header, records) = page.header_and_records(block.index);

        scheme.stamp_allocated(header, records, block.index, alloc_num, label);
        page.set_state(block.index, BlockState::Allocated);
        page.object_mut(block.index).fill(ALLOCATED_PATTERN);

        self.stats.record_alloc();

        let ptr = page.object_ptr(block.index);

        if self.config.debug {
            log::trace!(
                "[pagepool] allocate {:p} label={:?} alloc_num={} in_use={}",
                ptr,
                label,
                alloc_num,
                self.stats.objects_in_use
            );
        }

        Ok(ptr)
    }

    /// Gives an object back to the pool.
    ///
    /// A null pointer, or any call while nothing is allocated, is rejected.
    /// So is a pointer that is not the start of an object this pool handed
    /// out and has not taken back yet.
    pub fn free(&mut self, ptr: *mut u8) -> PoolResult<()> {
        let block = self.find_allocated(ptr).map_err(|fault| {
            log::warn!("[pagepool] rejected free of {:p}: {}", ptr, fault);
            PoolError::InvalidFree(fault)
        })?;

        guard::check(&self.pages[block.page], block.index)?;

        self.free_list.push(&mut self.pages, block);

        let scheme = self.config.header;
        let (header, records) = self.pages[block.page].header_and_records(block.index);

        scheme.stamp_freed(header, records, block.index);

        self.stats.record_free();

        if self.config.debug {
            log::trace!(
                "[pagepool] free {:p} in_use={}",
                ptr,
                self.stats.objects_in_use
            );
        }

        Ok(())
    }

    fn find_allocated(&self, ptr: *mut u8) -> Result<BlockRef, FreeFault> {
        if ptr.is_null() {
            return Err(FreeFault::NullPointer);
        }

        if self.stats.objects_in_use == 0 {
            return Err(FreeFault::NothingInUse);
        }

        let block = locate(&self.pages, ptr as usize)?;

        if self.pages[block.page].state(block.index) != BlockState::Allocated {
            return Err(FreeFault::NotAllocated);
        }

        Ok(block)
    }

    pub fn config(&self) -> PoolConfig {
        self.config
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.config.debug = debug;
    }

    pub fn is_debug(&self) -> bool {
        self.config.debug
    }

    /// Addresses of the free objects in the order they will be handed out.
    pub fn free_list(&self) -> impl Iterator<Item = NonNull<u8>> + '_ {
        self.free_list.iter(&self.pages)
    }

    /// Start addresses of the pages, newest first.
    pub fn page_list(&self) -> impl Iterator<Item = NonNull<u8>> + '_ {
        self.pages.iter().rev().map(Page::as_ptr)
    }

    /// The decoded header of the block whose object starts at `ptr`.
    pub fn header_info(&self, ptr: *const u8) -> Option<BlockHeader> {
        let block = locate(&self.pages, ptr as usize).ok()?;
        let page = &self.pages[block.page];

        Some(
            self.config
                .header
                .decode(page.header(block.index), &page.records, block.index),
        )
    }

    /// The external record of the block at `ptr`, if the pool uses external
    /// headers and the block has been handed out at least once.
    pub fn external_info(&self, ptr: *const u8) -> Option<ExternalRecord> {
        match self.header_info(ptr)? {
            BlockHeader::External(record) => record,
            _ => None,
        }
    }

    /// Checks the guard bytes of every block, in use or not, and calls
    /// `on_corrupt` with each damaged block's object and its size. Returns
    /// how many blocks were damaged.
    pub fn validate_pages(&self, mut on_corrupt: impl FnMut(NonNull<u8>, usize)) -> usize {
        let mut corrupted = 0;

        for page in self.pages.iter().rev() {
            if page.identity() != page.base() {
                log::warn!("[pagepool] page {:#x} lost its identification slot", page.base());
            }

            for index in 0..self.layout.objects_per_page {
                if guard::inspect(page, index).is_some() {
                    on_corrupt(page.object_ptr(index), self.layout.object_size);
                    corrupted += 1;
                }
            }
        }

        corrupted
    }

    /// Calls `on_block` for every object currently handed out and returns
    /// how many there were.
    pub fn dump_in_use(&self, mut on_block: impl FnMut(NonNull<u8>, usize)) -> usize {
        let mut in_use = 0;

        for page in self.pages.iter().rev() {
            for index in 0..self.layout.objects_per_page {
                if page.state(index) == BlockState::Allocated {
                    on_block(page.object_ptr(index), self.layout.object_size);
                    in_use += 1;
                }
            }
        }

        in_use
    }
}

impl Drop for PoolAllocator {
    fn drop(&mut self) {
        let records: usize = if self.config.header == HeaderScheme::External {
            self.pages.iter().map(|page| page.records.live()).sum()
        } else {
            0
        };

        log::debug!(
            "[pagepool] teardown: releasing {} pages, {} external records, {} objects still in use",
            self.pages.len(),
            records,
            self.stats.objects_in_use
        );

        // each page hands its bytes back to its source and drops its records
        self.pages.clear();
    }
}
