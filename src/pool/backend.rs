use super::constants::PAGE_ALIGN;
use crate::config::MemoryBackend;
use std::alloc::{alloc, dealloc, Layout};
use std::ptr::NonNull;
use std::rc::Rc;

/// Supplies the raw bytes pages are carved from.
pub trait PageSource {
    /// Returns `size` uninitialized bytes aligned to a machine word, or
    /// `None` if the memory could not be obtained.
    fn acquire(&self, size: usize) -> Option<NonNull<u8>>;

    /// Gives a page back.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `acquire` on this same source with
    /// the same `size`, and must not be used afterwards.
    unsafe fn release(&self, ptr: NonNull<u8>, size: usize);
}

/// Pages from Rust's global allocator.
#[derive(Copy, Clone, Debug, Default)]
pub struct NativeSource;

impl PageSource for NativeSource {
    fn acquire(&self, size: usize) -> Option<NonNull<u8>> {
        let layout = Layout::from_size_align(size, PAGE_ALIGN).ok()?;

        if layout.size() == 0 {
            return None;
        }

        NonNull::new(unsafe { alloc(layout) })
    }

    unsafe fn release(&self, ptr: NonNull<u8>, size: usize) {
        let layout = Layout::from_size_align_unchecked(size, PAGE_ALIGN);

        dealloc(ptr.as_ptr(), layout)
    }
}

/// Pages from the C heap.
#[derive(Copy, Clone, Debug, Default)]
pub struct RawSource;

impl PageSource for RawSource {
    fn acquire(&self, size: usize) -> Option<NonNull<u8>> {
        // malloc returns memory suitably aligned for any scalar type
        NonNull::new(unsafe { libc::malloc(size) }.cast::<u8>())
    }

    unsafe fn release(&self, ptr: NonNull<u8>, _size: usize) {
        libc::free(ptr.as_ptr().cast::<libc::c_void>())
    }
}

impl MemoryBackend {
    pub fn source(&self) -> Rc<dyn PageSource> {
        match self {
            MemoryBackend::Native => Rc::new(NativeSource),
            MemoryBackend::Raw => Rc::new(RawSource),
        }
    }
}
