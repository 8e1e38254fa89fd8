//! Typed headers for every [`HeaderScheme`] and their byte encodings.
//!
//! Multi-byte fields are stored little endian at the offsets below, relative
//! to the first header byte of a block.
//!
//! | scheme     | field        | offset           | width |
//! |------------|--------------|------------------|-------|
//! | `Basic`    | `alloc_num`  | 0                | 4     |
//! | `Basic`    | `flag`       | 4                | 1     |
//! | `Extended` | user bytes   | 0                | `u`   |
//! | `Extended` | `use_count`  | `u`              | 2     |
//! | `Extended` | `alloc_num`  | `u + 2`          | 4     |
//! | `Extended` | `flag`       | `u + 6`          | 1     |
//! | `External` | record key   | 0                | 8     |

use super::constants::{
    BASIC_HEADER_SIZE, EXTENDED_HEADER_FIXED_SIZE, EXTERNAL_HEADER_SIZE, FLAG_CLEAR, FLAG_IN_USE,
};
use crate::config::HeaderScheme;

impl HeaderScheme {
    /// Header bytes per block, or `None` if the extended user area is too
    /// large to describe.
    pub fn header_size(&self) -> Option<usize> {
        match self {
            HeaderScheme::None => Some(0),
            HeaderScheme::Basic => Some(BASIC_HEADER_SIZE),
            HeaderScheme::Extended { user_bytes } => {
                user_bytes.checked_add(EXTENDED_HEADER_FIXED_SIZE)
            }
            HeaderScheme::External => Some(EXTERNAL_HEADER_SIZE),
        }
    }

    /// Applies the allocate side mutation to a block's header bytes.
    pub(crate) fn stamp_allocated(
        &self,
        header: &mut [u8],
        records: &mut ExternalRecords,
        index: usize,
        alloc_num: u32,
        label: &str,
    ) {
        debug_assert_eq!(Some(header.len()), self.header_size());

        match self {
            HeaderScheme::None => {}
            HeaderScheme::Basic => BasicHeader {
                alloc_num,
                in_use: true,
            }
            .write(header),
            HeaderScheme::Extended { user_bytes } => {
                let previous = ExtendedHeader::read(header, *user_bytes);

                ExtendedHeader {
                    use_count: previous.use_count.wrapping_add(1),
                    alloc_num,
                    in_use: true,
                }
                .write(header, *user_bytes);
            }
            HeaderScheme::External => {
                let existed = records.get(index).is_some();
                let key = records.ensure(index);

                if existed && read_key(header) != key {
                    log::warn!(
                        "[pagepool] external key of block {} was overwritten, restoring it",
                        index
                    );
                }

                write_key(header, key);
                records.stamp(index, alloc_num, label);
            }
        }
    }

    /// Applies the free side mutation to a block's header bytes.
    pub(crate) fn stamp_freed(
        &self,
        header: &mut [u8],
        records: &mut ExternalRecords,
        index: usize,
    ) {
        match self {
            HeaderScheme::None => {}
            HeaderScheme::Basic => BasicHeader::default().write(header),
            HeaderScheme::Extended { user_bytes } => {
                let previous = ExtendedHeader::read(header, *user_bytes);

                ExtendedHeader {
                    use_count: previous.use_count,
                    alloc_num: 0,
                    in_use: false,
                }
                .write(header, *user_bytes);
            }
            HeaderScheme::External => records.release(index),
        }
    }

    pub(crate) fn decode(
        &self,
        header: &[u8],
        records: &ExternalRecords,
        index: usize,
    ) -> BlockHeader {
        match self {
            HeaderScheme::None => BlockHeader::None,
            HeaderScheme::Basic => BlockHeader::Basic(BasicHeader::read(header)),
            HeaderScheme::Extended { user_bytes } => {
                BlockHeader::Extended(ExtendedHeader::read(header, *user_bytes))
            }
            HeaderScheme::External => BlockHeader::External(records.get(index).cloned()),
        }
    }
}

/// A decoded block header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockHeader {
    None,
    Basic(BasicHeader),
    Extended(ExtendedHeader),
    /// `None` until the block has been handed out at least once.
    External(Option<ExternalRecord>),
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BasicHeader {
    pub alloc_num: u32,
    pub in_use: bool,
}

impl BasicHeader {
    fn read(bytes: &[u8]) -> Self {
        Self {
            alloc_num: read_u32(&bytes[0..4]),
            in_use: bytes[4] == FLAG_IN_USE,
        }
    }

    fn write(&self, bytes: &mut [u8]) {
        bytes[0..4].copy_from_slice(&self.alloc_num.to_le_bytes());
        bytes[4] = flag_byte(self.in_use);
    }
}

/// The caller reserved bytes at the front of an extended header are never
/// touched by the pool.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtendedHeader {
    /// How many times this block has been handed out.
    pub use_count: u16,
    pub alloc_num: u32,
    pub in_use: bool,
}

impl ExtendedHeader {
    fn read(bytes: &[u8], user_bytes: usize) -> Self {
        let fields = &bytes[user_bytes..];

        Self {
            use_count: u16::from_le_bytes([fields[0], fields[1]]),
            alloc_num: read_u32(&fields[2..6]),
            in_use: fields[6] == FLAG_IN_USE,
        }
    }

    fn write(&self, bytes: &mut [u8], user_bytes: usize) {
        let fields = &mut bytes[user_bytes..];

        fields[0..2].copy_from_slice(&self.use_count.to_le_bytes());
        fields[2..6].copy_from_slice(&self.alloc_num.to_le_bytes());
        fields[6] = flag_byte(self.in_use);
    }
}

/// Out-of-line metadata for a block under [`HeaderScheme::External`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExternalRecord {
    pub in_use: bool,
    pub alloc_num: u32,
    /// The label passed to `allocate`, dropped again on `free`.
    pub label: Option<String>,
}

/// Side table of external records, one slot per block of a page.
///
/// Records are found by block index. A header stores `index + 1` as its
/// key so that zeroed header bytes mean "no record yet"; the key is only
/// compared against, never trusted. Records outlive individual allocations
/// and are only dropped with the page.
pub(crate) struct ExternalRecords {
    slots: Vec<Option<ExternalRecord>>,
}

impl ExternalRecords {
    pub fn new(blocks: usize) -> Self {
        Self {
            slots: (0..blocks).map(|_| None).collect(),
        }
    }

    /// Creates the record of block `index` unless it exists, and returns
    /// the key its header should hold.
    fn ensure(&mut self, index: usize) -> u64 {
        self.slots[index].get_or_insert_with(ExternalRecord::default);

        index as u64 + 1
    }

    fn get(&self, index: usize) -> Option<&ExternalRecord> {
        self.slots.get(index)?.as_ref()
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut ExternalRecord> {
        self.slots.get_mut(index)?.as_mut()
    }

    fn stamp(&mut self, index: usize, alloc_num: u32, label: &str) {
        if let Some(record) = self.get_mut(index) {
            record.in_use = true;
            record.alloc_num = alloc_num;
            // replaces whatever label a previous owner left behind
            record.label = Some(label.to_owned());
        }
    }

    fn release(&mut self, index: usize) {
        if let Some(record) = self.get_mut(index) {
            record.in_use = false;
            record.label = None;
        }
    }

    /// Number of blocks that have a record, in use or not.
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

fn read_key(header: &[u8]) -> u64 {
    let mut raw = [0u8; 8];

    raw.copy_from_slice(&header[0..8]);
    u64::from_le_bytes(raw)
}

fn write_key(header: &mut [u8], key: u64) {
    header[0..8].copy_from_slice(&key.to_le_bytes());
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn flag_byte(in_use: bool) -> u8 {
    if in_use {
        FLAG_IN_USE
    } else {
        FLAG_CLEAR
    }
}
