//! Byte-range reads and pattern search against a snapshot.
//!
//! Neither operation crosses a block boundary: a read stops at the end of the
//! block holding its start address, and a pattern must lie entirely within
//! the remainder of that block.

use crate::dump::Snapshot;
use crate::error::{ErrorKind, HexError};

/// Bytes returned by [`Snapshot::read_bytes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteSpan {
    /// Bytes read, starting at the requested address.
    pub bytes: Vec<u8>,
    /// `true` when fewer bytes than requested were available in the block.
    pub truncated: bool,
}

impl Snapshot {
    /// Reads up to `count` bytes starting at `address`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when `address` is not inside any block.
    #[allow(clippy::cast_possible_truncation)]
    pub fn read_bytes(&self, address: u32, count: usize) -> Result<ByteSpan, HexError> {
        let block = self
            .block_containing(address)
            .ok_or_else(|| HexError::new(ErrorKind::NotFound).at_address(address))?;
        let offset = (address - block.start_address) as usize;
        let available = block.bytes.len() - offset;
        let take = count.min(available);
        Ok(ByteSpan {
            bytes: block.bytes[offset..offset + take].to_vec(),
            truncated: take < count,
        })
    }

    /// Finds the first occurrence of `pattern` at or after `start_address`
    /// within the block holding `start_address`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when `start_address` is outside every block, the
    /// pattern is empty, or the pattern does not occur in the rest of the block.
    #[allow(clippy::cast_possible_truncation)]
    pub fn find_pattern(&self, start_address: u32, pattern: &[u8]) -> Result<u32, HexError> {
        let not_found = || HexError::new(ErrorKind::NotFound).at_address(start_address);
        if pattern.is_empty() {
            return Err(not_found());
        }
        let block = self.block_containing(start_address).ok_or_else(not_found)?;
        let offset = (start_address - block.start_address) as usize;
        block.bytes[offset..]
            .windows(pattern.len())
            .position(|window| window == pattern)
            .map(|pos| start_address + pos as u32)
            .ok_or_else(not_found)
    }
}
