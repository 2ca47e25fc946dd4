//! Gap-aware memory snapshot built from a record store.
//!
//! A [`Snapshot`] is an ordered list of disjoint [`Block`]s. Adjacent data is
//! merged, so consecutive blocks are always separated by at least one
//! unoccupied address.

use crate::error::{ErrorKind, HexError};
use crate::store::RecordStore;

/// One contiguous run of occupied memory.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Block {
    /// Address of the first byte.
    pub start_address: u32,
    /// Block contents.
    pub bytes: Vec<u8>,
}

impl Block {
    /// Number of bytes in the block.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for a block without bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Exclusive end address, widened so a block ending at `u32::MAX` fits.
    #[must_use]
    pub fn end_address(&self) -> u64 {
        u64::from(self.start_address) + self.bytes.len() as u64
    }

    /// Returns `true` when `address` lies inside the block.
    #[must_use]
    pub fn contains(&self, address: u32) -> bool {
        address >= self.start_address && u64::from(address) < self.end_address()
    }
}

/// Ordered, non-overlapping, non-adjacent blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Snapshot {
    blocks: Vec<Block>,
}

impl Snapshot {
    /// Wraps blocks already known to satisfy the ordering invariant.
    #[must_use]
    pub(crate) const fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Blocks in increasing address order.
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` when the snapshot holds no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total number of occupied bytes.
    #[must_use]
    pub fn byte_count(&self) -> usize {
        self.blocks.iter().map(Block::len).sum()
    }

    /// Block holding `address`, found by binary search.
    #[must_use]
    pub fn block_containing(&self, address: u32) -> Option<&Block> {
        let index = self
            .blocks
            .partition_point(|block| block.end_address() <= u64::from(address));
        self.blocks.get(index).filter(|block| block.contains(address))
    }
}

/// Builds a snapshot with one forward pass over the store's data records.
///
/// # Errors
///
/// - `Overlay` with the first address claimed twice.
/// - `OutOfMemory` when a block buffer cannot grow.
/// - `NoData` when the store holds no data bytes.
pub fn build_snapshot(store: &RecordStore) -> Result<Snapshot, HexError> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut page = 0u32;

    for record in store {
        if let Some(base) = record.page_base() {
            page = base;
            continue;
        }
        if !record.is_data() || record.is_empty() {
            continue;
        }
        let address = page | u32::from(record.address_field());
        let data = record.payload();

        match blocks.last_mut() {
            Some(block) if u64::from(address) < block.end_address() => {
                log::warn!("address overlay at 0x{address:08X}");
                return Err(HexError::new(ErrorKind::Overlay).at_address(address));
            }
            Some(block) if u64::from(address) == block.end_address() => {
                block
                    .bytes
                    .try_reserve(data.len())
                    .map_err(|_| HexError::new(ErrorKind::OutOfMemory))?;
                block.bytes.extend_from_slice(data);
            }
            _ => {
                let mut bytes = Vec::new();
                bytes
                    .try_reserve(data.len())
                    .map_err(|_| HexError::new(ErrorKind::OutOfMemory))?;
                bytes.extend_from_slice(data);
                blocks.push(Block {
                    start_address: address,
                    bytes,
                });
            }
        }
    }

    if blocks.is_empty() {
        return Err(HexError::new(ErrorKind::NoData));
    }
    log::debug!("built snapshot with {} blocks", blocks.len());
    Ok(Snapshot::from_blocks(blocks))
}
