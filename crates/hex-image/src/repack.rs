//! Record re-packing.
//!
//! Both variants build a fresh store whose data records are cut at the target
//! length, at the end of a run of occupied bytes, or at a 64 KiB page
//! boundary, whichever comes first. The source store is never modified.

use crate::dump::Snapshot;
use crate::error::{ErrorKind, HexError};
use crate::record::{Record, PAGE_SIZE};
use crate::store::RecordStore;

/// Smallest accepted record data length.
pub const MIN_RECORD_LEN: u8 = 8;
/// Largest accepted record data length.
pub const MAX_RECORD_LEN: u8 = u8::MAX;

/// Clamps a requested record length into `[MIN_RECORD_LEN, MAX_RECORD_LEN]`.
#[must_use]
pub fn clamp_record_len(requested: usize) -> u8 {
    u8::try_from(requested)
        .unwrap_or(MAX_RECORD_LEN)
        .max(MIN_RECORD_LEN)
}

/// Accumulates re-packed records in address order.
struct Emitter {
    store: RecordStore,
    record_len: usize,
}

impl Emitter {
    fn new(record_len: u8) -> Self {
        Self {
            store: RecordStore::new(),
            record_len: usize::from(record_len),
        }
    }

    /// Emits records for one contiguous run starting at `address`.
    #[allow(clippy::cast_possible_truncation)]
    fn emit_run(&mut self, mut address: u32, mut data: &[u8]) {
        while !data.is_empty() {
            let to_boundary = (PAGE_SIZE - (address & 0xFFFF)) as usize;
            let take = self.record_len.min(to_boundary).min(data.len());
            let (chunk, rest) = data.split_at(take);
            self.store.insert_extended_address(address);
            self.store.insert_sorted(Record::data(address, chunk));
            data = rest;
            address = address.wrapping_add(take as u32);
        }
    }

    /// Carries over start-address records and appends the terminator.
    fn finish(mut self, source: &RecordStore) -> RecordStore {
        for record in source
            .iter()
            .filter(|r| !r.is_data() && !r.is_extended_linear() && !r.is_end_of_file())
        {
            self.store.insert_sorted(record.clone());
        }
        self.store.insert_sorted(Record::end_of_file());
        self.store
    }
}

/// Re-packs only the occupied blocks of `snapshot`.
///
/// Memory use is proportional to the data size, not the address span.
/// `source` supplies records that are carried over verbatim.
#[must_use]
pub fn repack_blocks(snapshot: &Snapshot, source: &RecordStore, record_len: u8) -> RecordStore {
    let mut emitter = Emitter::new(record_len);
    for block in snapshot.blocks() {
        emitter.emit_run(block.start_address, &block.bytes);
    }
    let store = emitter.finish(source);
    log::debug!(
        "re-packed {} blocks into {} records of up to {record_len} bytes",
        snapshot.len(),
        store.len()
    );
    store
}

/// Lowest and highest occupied address of the data records in `source`.
#[allow(clippy::cast_possible_truncation)]
fn data_bounds(source: &RecordStore) -> Option<(u32, u32)> {
    let mut page = 0u32;
    let mut bounds: Option<(u32, u32)> = None;
    for record in source {
        if let Some(base) = record.page_base() {
            page = base;
        } else if record.is_data() && !record.is_empty() {
            let first = page | u32::from(record.address_field());
            let last = first.saturating_add(record.payload().len() as u32 - 1);
            bounds = Some(bounds.map_or((first, last), |(lo, hi)| (lo.min(first), hi.max(last))));
        }
    }
    bounds
}

/// Re-packs through a flat image spanning the lowest to highest occupied address.
///
/// With `fill`, unoccupied bytes inside the span become data of that value.
/// Memory use is proportional to the whole span, gaps included.
///
/// # Errors
///
/// - `NoData` when the store holds no data bytes.
/// - `OutOfMemory` when the image buffer cannot be allocated.
/// - `Overlay` with the first address claimed twice.
#[allow(clippy::cast_possible_truncation)]
pub fn repack_linear(
    source: &RecordStore,
    record_len: u8,
    fill: Option<u8>,
) -> Result<RecordStore, HexError> {
    let (min_address, max_address) =
        data_bounds(source).ok_or_else(|| HexError::new(ErrorKind::NoData))?;
    let span = usize::try_from(u64::from(max_address - min_address) + 1)
        .map_err(|_| HexError::new(ErrorKind::OutOfMemory))?;
    let mut image = alloc_filled(span, fill.unwrap_or(0))?;
    let mut occupied = OccupancyMask::new(span)?;

    let mut page = 0u32;
    for record in source {
        if let Some(base) = record.page_base() {
            page = base;
            continue;
        }
        if !record.is_data() || record.is_empty() {
            continue;
        }
        let address = page | u32::from(record.address_field());
        let offset = (address - min_address) as usize;
        for (i, byte) in record.payload().iter().enumerate() {
            let slot = offset + i;
            if occupied.is_set(slot) {
                let overlay = address + i as u32;
                log::warn!("address overlay at 0x{overlay:08X}");
                return Err(HexError::new(ErrorKind::Overlay).at_address(overlay));
            }
            occupied.set(slot);
            image[slot] = *byte;
        }
    }

    let mut emitter = Emitter::new(record_len);
    if fill.is_some() {
        emitter.emit_run(min_address, &image);
    } else {
        let mut index = 0;
        while index < span {
            if !occupied.is_set(index) {
                index += 1;
                continue;
            }
            let run = (index..span).take_while(|slot| occupied.is_set(*slot)).count();
            emitter.emit_run(min_address + index as u32, &image[index..index + run]);
            index += run;
        }
    }
    let store = emitter.finish(source);
    log::debug!(
        "linearly re-packed {span} bytes into {} records of up to {record_len} bytes",
        store.len()
    );
    Ok(store)
}

/// One bit per byte of the linear image, set once the byte is claimed.
struct OccupancyMask {
    bits: Vec<u8>,
}

impl OccupancyMask {
    fn new(len: usize) -> Result<Self, HexError> {
        Ok(Self {
            bits: alloc_filled(len.div_ceil(8), 0)?,
        })
    }

    fn is_set(&self, slot: usize) -> bool {
        (self.bits[slot / 8] & (1 << (slot % 8))) != 0
    }

    fn set(&mut self, slot: usize) {
        self.bits[slot / 8] |= 1 << (slot % 8);
    }
}

fn alloc_filled(len: usize, value: u8) -> Result<Vec<u8>, HexError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| HexError::new(ErrorKind::OutOfMemory))?;
    buffer.resize(len, value);
    Ok(buffer)
}
