use super::constants::PAD_PATTERN;
use super::page::Page;
use crate::error::{CorruptionSite, PoolError, PoolResult};
use std::ops::Range;

/// Finds the first guard zone of block `index` that no longer holds the pad
/// pattern. Always `None` when the pool has no pad bytes.
pub fn inspect(page: &Page, index: usize) -> Option<CorruptionSite> {
    let layout = page.layout();

    if layout.pad_bytes == 0 {
        return None;
    }

    let intact = |range: Range<usize>| page.bytes(range).iter().all(|byte| *byte == PAD_PATTERN);

    if !intact(layout.pre_pad_range(index)) {
        return Some(CorruptionSite::BeforeObject);
    }

    if !intact(layout.post_pad_range(index)) {
        return Some(CorruptionSite::AfterObject);
    }

    None
}

pub fn check(page: &Page, index: usize) -> PoolResult<()> {
    match inspect(page, index) {
        None => Ok(()),
        Some(site) => {
            let address = page.object_addr(index);

            log::warn!("[pagepool] corrupted block {:#x}: guard bytes {} object", address, site);

            Err(PoolError::CorruptedBlock { site, address })
        }
    }
}
