use super::constants::FREED_PATTERN;
use super::page::{BlockState, Page};
use crate::error::{CorruptionSite, FreeFault, PoolError, PoolResult};
use std::ptr::NonNull;

/// A block, named by the position of its page in the pool and its index
/// within that page.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockRef {
    pub page: usize,
    pub index: usize,
}

/// Finds the block whose object starts at `addr`.
pub fn locate(pages: &[Page], addr: usize) -> Result<BlockRef, FreeFault> {
    let (page, owner) = pages
        .iter()
        .enumerate()
        .find(|(_, page)| page.contains(addr))
        .ok_or(FreeFault::ForeignPointer)?;
    let index = owner.index_of(addr).ok_or(FreeFault::NotOnBoundary)?;

    Ok(BlockRef { page, index })
}

/// LIFO list of free blocks, linked through the first word of each free
/// block's object bytes. A link of 0 ends the list.
pub struct FreeList {
    head: Option<BlockRef>,
}

impl FreeList {
    pub fn new() -> Self {
        Self { head: None }
    }

    pub fn head(&self) -> Option<BlockRef> {
        self.head
    }

    fn head_addr(&self, pages: &[Page]) -> usize {
        self.head
            .map_or(0, |head| pages[head.page].object_addr(head.index))
    }

    /// Threads every block of a freshly formatted page onto the list, lowest
    /// address first, leaving the page's last block at the head.
    pub fn seed(&mut self, pages: &mut [Page], page: usize) -> BlockRef {
        let mut link = self.head_addr(pages);
        let fresh = &mut pages[page];
        let blocks = fresh.layout().objects_per_page;

        for index in 0..blocks {
            fresh.write_link(index, link);
            link = fresh.object_addr(index);
        }

        let head = BlockRef {
            page,
            index: blocks - 1,
        };

        self.head = Some(head);
        head
    }

    /// Unlinks the head. `Ok(None)` when the list is empty.
    ///
    /// A link that does not lead to another free block means the head was
    /// written to while it sat in the list; the list is left untouched.
    pub fn pop(&mut self, pages: &[Page]) -> PoolResult<Option<BlockRef>> {
        let Some(head) = self.head else {
            return Ok(None);
        };

        let owner = &pages[head.page];
        let link = owner.read_link(head.index);
        let next = if link == 0 {
            None
        } else {
            let corrupted = PoolError::CorruptedBlock {
                site: CorruptionSite::FreeLink,
                address: owner.object_addr(head.index),
            };
            let next = locate(pages, link).map_err(|_| corrupted.clone())?;

            if !pages[next.page].state(next.index).is_free() || next == head {
                return Err(corrupted);
            }

            Some(next)
        };

        self.head = next;

        Ok(Some(head))
    }

    /// Fills the block with the freed pattern and makes it the new head.
    pub fn push(&mut self, pages: &mut [Page], block: BlockRef) {
        let link = self.head_addr(pages);
        let page = &mut pages[block.page];

        page.set_state(block.index, BlockState::Freed);
        page.object_mut(block.index).fill(FREED_PATTERN);
        page.write_link(block.index, link);

        self.head = Some(block);
    }

    pub fn iter<'a>(&self, pages: &'a [Page]) -> FreeListIter<'a> {
        FreeListIter {
            pages,
            next: self.head,
            remaining: pages.iter().map(|page| page.layout().objects_per_page).sum(),
        }
    }
}

/// Walks the list without trusting it: a scribbled link ends the walk, and
/// no more blocks are yielded than the pages hold, so a looped list still
/// terminates.
pub struct FreeListIter<'a> {
    pages: &'a [Page],
    next: Option<BlockRef>,
    remaining: usize,
}

impl<'a> Iterator for FreeListIter<'a> {
    type Item = NonNull<u8>;

    fn next(&mut self) -> Option<NonNull<u8>> {
        let block = self.next?;

        if self.remaining == 0 {
            log::warn!("[pagepool] free list walk exceeded the pool's block count");
            self.next = None;
            return None;
        }

        self.remaining -= 1;

        let page = &self.pages[block.page];
        let link = page.read_link(block.index);

        self.next = match link {
            0 => None,
            addr => locate(self.pages, addr).ok().filter(|next| {
                *next != block && self.pages[next.page].state(next.index).is_free()
            }),
        };

        Some(page.object_ptr(block.index))
    }
}

#[cfg(test)]
mod tests {
    use super::super::backend::NativeSource;
    use super::super::constants::LINK_SIZE;
    use super::super::layout::PoolLayout;
    use super::*;
    use crate::config::PoolConfig;
    use std::rc::Rc;

    fn pages(count: usize) -> Vec<Page> {
        let layout = PoolLayout::new(16, &PoolConfig::default()).unwrap();

        (0..count)
            .map(|_| Page::new(Rc::new(NativeSource), layout).unwrap())
            .collect()
    }

    #[test]
    fn seeded_page_pops_from_highest_address() {
        let mut pages = pages(1);
        let mut list = FreeList::new();

        list.seed(&mut pages, 0);

        for expected in (0..4).rev() {
            let block = list.pop(&pages).unwrap().unwrap();

            assert_eq!(block.index, expected);
            pages[0].set_state(block.index, BlockState::Allocated);
        }

        assert_eq!(list.head(), None);
        assert_eq!(list.pop(&pages), Ok(None));
    }

    #[test]
    fn second_page_chains_onto_first() {
        let mut pages = pages(2);
        let mut list = FreeList::new();

        list.seed(&mut pages, 0);
        list.seed(&mut pages, 1);

        let order: Vec<usize> = list.iter(&pages).map(|ptr| ptr.as_ptr() as usize).collect();
        let expected: Vec<usize> = (0..4)
            .rev()
            .map(|i| pages[1].object_addr(i))
            .chain((0..4).rev().map(|i| pages[0].object_addr(i)))
            .collect();

        assert_eq!(order, expected);
    }

    #[test]
    fn push_is_lifo() {
        let mut pages = pages(1);
        let mut list = FreeList::new();

        list.seed(&mut pages, 0);

        let a = list.pop(&pages).unwrap().unwrap();
        pages[0].set_state(a.index, BlockState::Allocated);
        let b = list.pop(&pages).unwrap().unwrap();
        pages[0].set_state(b.index, BlockState::Allocated);

        list.push(&mut pages, a);
        list.push(&mut pages, b);

        assert_eq!(list.pop(&pages).unwrap(), Some(b));
        assert_eq!(list.pop(&pages).unwrap(), Some(a));
    }

    #[test]
    fn pushed_block_is_filled_with_freed_pattern() {
        let mut pages = pages(1);
        let mut list = FreeList::new();

        list.seed(&mut pages, 0);

        let block = list.pop(&pages).unwrap().unwrap();
        pages[0].set_state(block.index, BlockState::Allocated);
        list.push(&mut pages, block);

        let object = pages[0].object(block.index);
        assert!(object[LINK_SIZE..].iter().all(|b| *b == FREED_PATTERN));
    }

    #[test]
    fn scribbled_link_is_corruption() {
        let mut pages = pages(1);
        let mut list = FreeList::new();

        list.seed(&mut pages, 0);
        pages[0].object_mut(3)[..LINK_SIZE].copy_from_slice(&1usize.to_ne_bytes());

        let result = list.pop(&pages);

        assert!(matches!(
            result,
            Err(PoolError::CorruptedBlock {
                site: CorruptionSite::FreeLink,
                ..
            })
        ));
        assert_eq!(list.head().map(|b| b.index), Some(3));
    }

    #[test]
    fn looped_list_walk_terminates() {
        let mut pages = pages(1);
        let mut list = FreeList::new();

        list.seed(&mut pages, 0);

        // block 0 ends the seeded chain; point it back at the head
        let head = pages[0].object_addr(3);
        pages[0].write_link(0, head);

        assert_eq!(list.iter(&pages).count(), 4);

        // a block linking to itself stops right away
        let own = pages[0].object_addr(3);
        pages[0].write_link(3, own);

        assert_eq!(list.iter(&pages).count(), 1);
    }

    #[test]
    fn locate_faults() {
        let pages = pages(1);
        let addr = pages[0].object_addr(2);

        assert_eq!(locate(&pages, addr), Ok(BlockRef { page: 0, index: 2 }));
        assert_eq!(locate(&pages, addr + 1), Err(FreeFault::NotOnBoundary));
        assert_eq!(locate(&pages, 8), Err(FreeFault::ForeignPointer));
    }
}
