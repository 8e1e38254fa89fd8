use std::mem::size_of;

// Fill patterns, one byte each, written across the matching region.
pub const UNALLOCATED_PATTERN: u8 = 0xAA;
pub const ALLOCATED_PATTERN: u8 = 0xBB;
pub const FREED_PATTERN: u8 = 0xCC;
pub const PAD_PATTERN: u8 = 0xDD;
pub const ALIGN_PATTERN: u8 = 0xEE;

// The identification slot at the start of every page holds the page's own
// address, and a free block's first word holds the address of the next one.
pub const PTR_SIZE: usize = size_of::<usize>();
pub const LINK_SIZE: usize = size_of::<usize>();
pub const PAGE_ALIGN: usize = std::mem::align_of::<usize>();

pub const BASIC_HEADER_SIZE: usize = size_of::<u32>() + size_of::<u8>();
pub const EXTENDED_HEADER_FIXED_SIZE: usize = size_of::<u16>() + size_of::<u32>() + size_of::<u8>();
pub const EXTERNAL_HEADER_SIZE: usize = size_of::<u64>();

pub const FLAG_IN_USE: u8 = 0x01;
pub const FLAG_CLEAR: u8 = 0x00;
