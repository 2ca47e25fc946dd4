//! Format classification and shared import state.
//!
//! Every import starts from an empty store seeded with a zero-offset page
//! record as an anchor. The anchor is removed once the input has been fully
//! consumed, leaving only records derived from the input.

/// Intel-HEX importer.
pub mod intel;
/// Motorola S-Record importer.
pub mod srec;

pub use intel::import_intel;
pub use srec::import_srecord;

use crate::codec::decode_byte;
use crate::error::{ErrorKind, HexError, Warning};
use crate::record::{Command, Record, PAGE_SIZE};
use crate::stats::ImageStats;
use crate::store::RecordStore;

/// Record types recognised on an S-Record line.
pub(crate) const SRECORD_TYPES: &[u8] = b"01235789";

/// Text format of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FileFormat {
    /// Intel-HEX (`:` records).
    IntelHex,
    /// Motorola S-Record (`S` records).
    SRecord,
}

/// Result of a successful import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Sorted records derived from the input.
    pub store: RecordStore,
    /// Counters gathered while importing.
    pub stats: ImageStats,
    /// Non-fatal conditions encountered.
    pub warnings: Vec<Warning>,
}

/// Iterates non-empty trimmed lines with their 1-indexed line numbers.
pub(crate) fn numbered_lines(text: &str) -> impl Iterator<Item = (usize, &str)> + '_ {
    text.lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

/// Classifies `text` by its first non-empty line.
///
/// # Errors
///
/// - `NoData` when the input has no non-empty line.
/// - `UnknownCommand` when the prefix is recognised but the record type is not.
/// - `Syntax` for a bare `S` without a type digit.
/// - `Syntax` for any other first line.
pub fn sniff_format(text: &str) -> Result<FileFormat, HexError> {
    let Some((line_no, line)) = numbered_lines(text).next() else {
        return Err(HexError::new(ErrorKind::NoData));
    };
    if let Some(body) = line.strip_prefix(':') {
        let command = decode_byte(body.as_bytes(), 3).map_err(|e| e.at_line(line_no))?;
        if command <= Command::MAX {
            return Ok(FileFormat::IntelHex);
        }
        return Err(HexError::new(ErrorKind::UnknownCommand).at_line(line_no));
    }
    if let Some(rest) = line.strip_prefix('S') {
        return match rest.bytes().next() {
            Some(kind) if SRECORD_TYPES.contains(&kind) => Ok(FileFormat::SRecord),
            Some(_) => Err(HexError::new(ErrorKind::UnknownCommand).at_line(line_no)),
            None => Err(HexError::new(ErrorKind::Syntax).at_line(line_no)),
        };
    }
    Err(HexError::new(ErrorKind::Syntax).at_line(line_no))
}

/// Classifies and imports `text`.
///
/// # Errors
///
/// Propagates classification and importer errors.
pub fn import(text: &str) -> Result<(FileFormat, ImportOutcome), HexError> {
    let format = sniff_format(text)?;
    let outcome = match format {
        FileFormat::IntelHex => import_intel(text)?,
        FileFormat::SRecord => import_srecord(text)?,
    };
    Ok((format, outcome))
}

/// Working state shared by both importers.
#[derive(Debug)]
pub(crate) struct Importer {
    pub(crate) store: RecordStore,
    pub(crate) stats: ImageStats,
    pub(crate) warnings: Vec<Warning>,
}

impl Importer {
    pub(crate) fn new() -> Self {
        let mut store = RecordStore::new();
        store.insert_sorted(Record::extended_linear(0));
        Self {
            store,
            stats: ImageStats::default(),
            warnings: Vec::new(),
        }
    }

    /// Makes sure a page record covering `address` exists.
    pub(crate) fn ensure_page(&mut self, address: u32) {
        if self.store.insert_extended_address(address) {
            log::trace!("page record inserted for 0x{:04X}", address >> 16);
        }
    }

    /// Stores an already validated record under its own raw form.
    pub(crate) fn insert_raw(&mut self, raw: Vec<u8>, address: u32) {
        let record = Record::from_raw(raw, address);
        if record.is_data() {
            self.stats.record_data(address, record.payload().len());
        }
        self.store.insert_sorted(record);
    }

    /// Stores `data` at `start`, splitting at a page boundary if it straddles one.
    ///
    /// The page holding `start` must already be present.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn insert_data(&mut self, start: u32, data: &[u8]) {
        let room = (PAGE_SIZE - (start & 0xFFFF)) as usize;
        if data.len() <= room {
            self.push_data(start, data);
            return;
        }
        let boundary = start + room as u32;
        log::trace!("splitting record at page boundary 0x{boundary:08X}");
        let (head, tail) = data.split_at(room);
        self.push_data(start, head);
        self.ensure_page(boundary);
        self.push_data(boundary, tail);
    }

    fn push_data(&mut self, address: u32, data: &[u8]) {
        self.stats.record_data(address, data.len());
        self.store.insert_sorted(Record::data(address, data));
    }

    /// Appends the terminator, drops the anchor record and returns the result.
    pub(crate) fn finish(mut self, eof: Record) -> ImportOutcome {
        self.store.insert_sorted(eof);
        self.store.remove_first();
        self.stats.new_line_count = self.store.len();
        ImportOutcome {
            store: self.store,
            stats: self.stats,
            warnings: self.warnings,
        }
    }
}

/// Narrows `start` to 32 bits when `len` bytes from it stay inside the address space.
pub(crate) fn checked_start(start: u64, len: usize) -> Option<u32> {
    let end = start + len as u64;
    if end > u64::from(u32::MAX) + 1 {
        None
    } else {
        u32::try_from(start).ok()
    }
}
