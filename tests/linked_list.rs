use pagepool::{
    HeaderScheme, PoolAllocator, PoolConfig, PoolError, PoolHandle, PoolResult, SharedPool,
};
use std::cell::RefCell;
use std::ptr::NonNull;
use std::rc::Rc;

struct Node {
    next: Option<NonNull<Node>>,
    val: u64,
}

/// A singly linked stack whose nodes live in a pool.
pub struct LinkedList {
    head: Option<NonNull<Node>>,
    len: usize,
    pool: PoolHandle,
}

impl LinkedList {
    pub fn new(pool: PoolHandle) -> Self {
        Self {
            head: None,
            len: 0,
            pool,
        }
    }

    pub fn push_front(&mut self, val: u64) -> PoolResult<()> {
        let node = self.pool.allocate("list node")?.cast::<Node>();

        unsafe {
            node.as_ptr().write_unaligned(Node {
                next: self.head,
                val,
            })
        };

        self.head = Some(node);
        self.len += 1;

        Ok(())
    }

    pub fn pop_front(&mut self) -> PoolResult<Option<u64>> {
        let Some(node) = self.head else {
            return Ok(None);
        };
        let Node { next, val } = unsafe { node.as_ptr().read_unaligned() };

        self.pool.free(node.as_ptr().cast())?;
        self.head = next;
        self.len -= 1;

        Ok(Some(val))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        let mut next = self.head;

        std::iter::from_fn(move || {
            let node = unsafe { next?.as_ptr().read_unaligned() };

            next = node.next;
            Some(node.val)
        })
    }

    pub fn clear(&mut self) -> PoolResult<()> {
        while self.pop_front()?.is_some() {}

        Ok(())
    }
}

impl Drop for LinkedList {
    fn drop(&mut self) {
        // a corrupted node stops the walk, the pool still frees the page
        let _ = self.clear();

        self.pool.release();
    }
}

fn pool() -> PoolAllocator {
    let config = PoolConfig::default()
        .with_objects_per_page(8)
        .with_max_pages(4)
        .with_pad_bytes(4)
        .with_header(HeaderScheme::Basic);

    PoolAllocator::new(std::mem::size_of::<Node>(), config).unwrap()
}

#[test]
fn owned_list_push_and_pop() {
    let mut list = LinkedList::new(PoolHandle::owned(pool()));

    for i in 0..20 {
        list.push_front(i).unwrap();
    }

    assert_eq!(list.len(), 20);
    assert_eq!(list.iter().collect::<Vec<u64>>(), (0..20).rev().collect::<Vec<u64>>());

    for i in (10..20).rev() {
        assert_eq!(list.pop_front().unwrap(), Some(i));
    }

    assert_eq!(list.len(), 10);
}

#[test]
fn owned_list_runs_out_of_pages() {
    let mut list = LinkedList::new(PoolHandle::owned(pool()));

    for i in 0..32 {
        list.push_front(i).unwrap();
    }

    assert_eq!(
        list.push_front(32),
        Err(PoolError::PageLimitExceeded { max_pages: 4 })
    );
    assert_eq!(list.len(), 32);
}

#[test]
fn lists_share_one_pool() {
    let shared: SharedPool = Rc::new(RefCell::new(pool()));
    let mut evens = LinkedList::new(PoolHandle::shared(&shared));
    let mut odds = LinkedList::new(PoolHandle::shared(&shared));

    for i in 0..10 {
        if i % 2 == 0 {
            evens.push_front(i).unwrap();
        } else {
            odds.push_front(i).unwrap();
        }
    }

    assert_eq!(shared.borrow().stats().objects_in_use, 10);

    drop(evens);

    assert_eq!(shared.borrow().stats().objects_in_use, 5);
    assert_eq!(odds.iter().collect::<Vec<u64>>(), vec![9, 7, 5, 3, 1]);

    odds.clear().unwrap();

    let stats = shared.borrow().stats();
    assert_eq!(stats.objects_in_use, 0);
    assert_eq!(stats.allocations, stats.deallocations);
}

#[test]
fn dropped_shared_list_keeps_pool_alive() {
    let shared: SharedPool = Rc::new(RefCell::new(pool()));

    {
        let mut list = LinkedList::new(PoolHandle::shared(&shared));
        list.push_front(1).unwrap();
    }

    assert_eq!(Rc::strong_count(&shared), 1);
    assert_eq!(shared.borrow_mut().validate_pages(|_, _| {}), 0);

    let ptr = shared.borrow_mut().allocate("after").unwrap();
    shared.borrow_mut().free(ptr.as_ptr()).unwrap();
}

#[test]
fn detached_list_cannot_grow() {
    let mut list = LinkedList::new(PoolHandle::Detached);

    assert_eq!(list.push_front(1), Err(PoolError::NotConfigured));
    assert_eq!(list.pop_front(), Ok(None));
    assert_eq!(list.len(), 0);
}
