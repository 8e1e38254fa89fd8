//! Byte offsets of everything inside a page.
//!
//! ```text
//! page:  | self addr | left align | block 0 | inter | block 1 | ... | block N-1 | trailing |
//! block: | header | pre pad | object | post pad |
//! ```
//!
//! | region      | offset within the page                                        | length                  |
//! |-------------|---------------------------------------------------------------|-------------------------|
//! | self addr   | `0`                                                           | `PTR_SIZE`              |
//! | left align  | `PTR_SIZE`                                                    | `left_align_bytes`      |
//! | header `i`  | `PTR_SIZE + left_align_bytes + i * stride`                    | `header_size`           |
//! | pre pad `i` | `header(i) + header_size`                                     | `pad_bytes`             |
//! | object `i`  | `pre_pad(i) + pad_bytes`                                      | `object_size`           |
//! | post pad `i`| `object(i) + object_size`                                     | `pad_bytes`             |
//! | inter `i`   | `post_pad(i) + pad_bytes` (only between blocks)               | `inter_align_bytes`     |
//! | trailing    | `blocks_end`                                                  | `pad_bytes * max_pages` |
//!
//! where `stride = block_size + inter_align_bytes`. Every other module asks
//! this table for offsets instead of doing its own arithmetic.

use super::constants::{LINK_SIZE, PTR_SIZE};
use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use std::ops::Range;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PoolLayout {
    pub object_size: usize,
    pub header_size: usize,
    pub pad_bytes: usize,
    pub block_size: usize,
    pub page_size: usize,
    pub objects_per_page: usize,
    left_align_bytes: usize,
    inter_align_bytes: usize,
    stride: usize,
    first_header: usize,
    blocks_end: usize,
}

impl PoolLayout {
    pub fn new(object_size: usize, config: &PoolConfig) -> PoolResult<Self> {
        config.validate()?;

        if object_size < LINK_SIZE {
            return Err(PoolError::InvalidConfig(
                "object size must be able to hold a free list link",
            ));
        }

        let overflow = PoolError::InvalidConfig("page size overflows usize");
        let header_size = config.header.header_size().ok_or(overflow.clone())?;
        let n = config.objects_per_page;

        let block_size = config
            .pad_bytes
            .checked_mul(2)
            .and_then(|pads| pads.checked_add(object_size))
            .and_then(|size| size.checked_add(header_size))
            .ok_or(overflow.clone())?;
        let stride = block_size
            .checked_add(config.inter_align_bytes)
            .ok_or(overflow.clone())?;
        let first_header = PTR_SIZE
            .checked_add(config.left_align_bytes)
            .ok_or(overflow.clone())?;
        let blocks_end = block_size
            .checked_mul(n)
            .and_then(|blocks| {
                config
                    .inter_align_bytes
                    .checked_mul(n - 1)
                    .and_then(|gaps| blocks.checked_add(gaps))
            })
            .and_then(|body| body.checked_add(first_header))
            .ok_or(overflow.clone())?;
        // Sized by the configured page cap, not by anything on this page.
        let page_size = config
            .pad_bytes
            .checked_mul(config.max_pages)
            .and_then(|trailing| trailing.checked_add(blocks_end))
            .ok_or(overflow)?;

        Ok(Self {
            object_size,
            header_size,
            pad_bytes: config.pad_bytes,
            block_size,
            page_size,
            objects_per_page: n,
            left_align_bytes: config.left_align_bytes,
            inter_align_bytes: config.inter_align_bytes,
            stride,
            first_header,
            blocks_end,
        })
    }

    pub fn header_offset(&self, index: usize) -> usize {
        debug_assert!(index < self.objects_per_page);

        self.first_header + index * self.stride
    }

    pub fn object_offset(&self, index: usize) -> usize {
        self.header_offset(index) + self.header_size + self.pad_bytes
    }

    pub fn header_range(&self, index: usize) -> Range<usize> {
        let start = self.header_offset(index);

        start..start + self.header_size
    }

    pub fn object_range(&self, index: usize) -> Range<usize> {
        let start = self.object_offset(index);

        start..start + self.object_size
    }

    pub fn pre_pad_range(&self, index: usize) -> Range<usize> {
        let end = self.object_offset(index);

        end - self.pad_bytes..end
    }

    pub fn post_pad_range(&self, index: usize) -> Range<usize> {
        let start = self.object_offset(index) + self.object_size;

        start..start + self.pad_bytes
    }

    pub fn left_align_range(&self) -> Range<usize> {
        PTR_SIZE..PTR_SIZE + self.left_align_bytes
    }

    /// The alignment gap that precedes block `index`. Empty for block 0.
    pub fn inter_align_range(&self, index: usize) -> Range<usize> {
        if index == 0 {
            return self.first_header..self.first_header;
        }

        let end = self.header_offset(index);

        end - self.inter_align_bytes..end
    }

    pub fn trailing_range(&self) -> Range<usize> {
        self.blocks_end..self.page_size
    }

    /// Maps an offset within a page back to the block whose object starts
    /// there, or `None` when the offset is not the first byte of an object.
    pub fn index_of(&self, offset: usize) -> Option<usize> {
        let distance = offset.checked_sub(self.object_offset(0))?;

        if distance % self.stride != 0 || offset >= self.blocks_end {
            return None;
        }

        Some(distance / self.stride)
    }
}
