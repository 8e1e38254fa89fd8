use super::backend::PageSource;
use super::constants::{
    ALIGN_PATTERN, LINK_SIZE, PAD_PATTERN, PTR_SIZE, UNALLOCATED_PATTERN,
};
use super::header::ExternalRecords;
use super::layout::PoolLayout;
use crate::error::{PoolError, PoolResult};
use std::ops::Range;
use std::ptr::NonNull;
use std::rc::Rc;

/// What a block's object region currently holds.
///
/// Only `Unallocated` and `Freed` blocks carry a free list link in their
/// first word; an `Allocated` block's bytes belong to the caller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockState {
    Unallocated,
    Allocated,
    Freed,
}

impl BlockState {
    pub fn is_free(self) -> bool {
        self != BlockState::Allocated
    }
}

/// One page obtained from a [`PageSource`], plus the bookkeeping the pool
/// keeps for its blocks.
pub struct Page {
    ptr: NonNull<u8>,
    layout: PoolLayout,
    source: Rc<dyn PageSource>,
    states: Vec<BlockState>,
    pub(crate) records: ExternalRecords,
}

impl Page {
    /// Acquires and formats a page. The blocks are not linked into any free
    /// list yet.
    pub fn new(source: Rc<dyn PageSource>, layout: PoolLayout) -> PoolResult<Page> {
        let ptr = source.acquire(layout.page_size).ok_or(PoolError::OutOfMemory {
            bytes: layout.page_size,
        })?;
        let blocks = layout.objects_per_page;
        let mut page = Page {
            ptr,
            layout,
            source,
            states: vec![BlockState::Unallocated; blocks],
            records: ExternalRecords::new(blocks),
        };

        page.format();

        Ok(page)
    }

    fn format(&mut self) {
        let base = self.base();
        let layout = self.layout;

        self.bytes_mut(0..PTR_SIZE)
            .copy_from_slice(&base.to_ne_bytes());
        self.bytes_mut(layout.left_align_range()).fill(ALIGN_PATTERN);

        for i in 0..layout.objects_per_page {
            self.bytes_mut(layout.inter_align_range(i)).fill(ALIGN_PATTERN);
            self.bytes_mut(layout.header_range(i)).fill(0);
            self.bytes_mut(layout.pre_pad_range(i)).fill(PAD_PATTERN);
            self.bytes_mut(layout.object_range(i)).fill(UNALLOCATED_PATTERN);
            self.bytes_mut(layout.post_pad_range(i)).fill(PAD_PATTERN);
        }

        self.bytes_mut(layout.trailing_range()).fill(ALIGN_PATTERN);
    }

    pub fn base(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    pub fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// The address stored in the page's identification slot.
    pub fn identity(&self) -> usize {
        let mut raw = [0u8; PTR_SIZE];

        raw.copy_from_slice(self.bytes(0..PTR_SIZE));
        usize::from_ne_bytes(raw)
    }

    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.base() && addr < self.base() + self.layout.page_size
    }

    /// Block index of the object starting at `addr`, which must lie in
    /// this page.
    pub fn index_of(&self, addr: usize) -> Option<usize> {
        debug_assert!(self.contains(addr));

        self.layout.index_of(addr - self.base())
    }

    pub fn object_addr(&self, index: usize) -> usize {
        self.base() + self.layout.object_offset(index)
    }

    pub fn object_ptr(&self, index: usize) -> NonNull<u8> {
        // in bounds of a live allocation, so never null
        unsafe { NonNull::new_unchecked(self.ptr.as_ptr().add(self.layout.object_offset(index))) }
    }

    pub fn state(&self, index: usize) -> BlockState {
        self.states[index]
    }

    pub fn set_state(&mut self, index: usize, state: BlockState) {
        self.states[index] = state;
    }

    pub fn bytes(&self, range: Range<usize>) -> &[u8] {
        assert!(range.start <= range.end && range.end <= self.layout.page_size);

        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().add(range.start), range.len()) }
    }

    pub fn bytes_mut(&mut self, range: Range<usize>) -> &mut [u8] {
        assert!(range.start <= range.end && range.end <= self.layout.page_size);

        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr().add(range.start), range.len()) }
    }

    pub fn object(&self, index: usize) -> &[u8] {
        self.bytes(self.layout.object_range(index))
    }

    pub fn object_mut(&mut self, index: usize) -> &mut [u8] {
        self.bytes_mut(self.layout.object_range(index))
    }

    pub fn header(&self, index: usize) -> &[u8] {
        self.bytes(self.layout.header_range(index))
    }

    /// The header bytes of a block together with the page's record table,
    /// which the external scheme needs to update at the same time.
    pub fn header_and_records(&mut self, index: usize) -> (&mut [u8], &mut ExternalRecords) {
        let range = self.layout.header_range(index);

        assert!(range.end <= self.layout.page_size);

        let header =
            unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr().add(range.start), range.len()) };

        (header, &mut self.records)
    }

    /// Reads the free list link out of a free block's first object word.
    pub fn read_link(&self, index: usize) -> usize {
        debug_assert!(self.states[index].is_free());

        let mut raw = [0u8; LINK_SIZE];

        raw.copy_from_slice(&self.object(index)[..LINK_SIZE]);
        usize::from_ne_bytes(raw)
    }

    pub fn write_link(&mut self, index: usize, next: usize) {
        debug_assert!(self.states[index].is_free());

        self.object_mut(index)[..LINK_SIZE].copy_from_slice(&next.to_ne_bytes());
    }

    pub fn layout(&self) -> &PoolLayout {
        &self.layout
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        unsafe { self.source.release(self.ptr, self.layout.page_size) }
    }
}
