mod allocator;
mod backend;
mod constants;
mod free_list;
mod guard;
mod header;
mod layout;
mod page;


pub use allocator::PoolAllocator;
pub use backend::{NativeSource, PageSource, RawSource};
pub use header::{BasicHeader, BlockHeader, ExtendedHeader, ExternalRecord};
