//! Intel-HEX import with 16-to-32-bit address virtualization.
//!
//! Segment offsets (`value << 4`) that do not fall on a 64 KiB page are
//! rewritten into linear-page form, so every stored data record is addressed
//! by a page record plus a 16-bit field. Records that straddle a page
//! boundary are split in two, each with its own checksum.

use crate::codec::{checksum_intel, decode_line};
use crate::error::{ErrorKind, HexError, Warning};
use crate::import::{checked_start, numbered_lines, ImportOutcome, Importer};
use crate::record::{Command, Record, PAGE_SIZE, RECORD_OVERHEAD};

/// Imports Intel-HEX `text`.
///
/// A missing terminator is tolerated: one is synthesized and
/// [`Warning::MissingEof`] is reported. Lines after the terminator are ignored.
///
/// # Errors
///
/// - `Syntax` for malformed lines or records addressing past 4 GiB.
/// - `Checksum` when a record's byte sum is not zero.
/// - `UnknownCommand` for command bytes above `0x05`.
///
/// Every error carries the offending line number.
pub fn import_intel(text: &str) -> Result<ImportOutcome, HexError> {
    let mut importer = Importer::new();
    let mut eof = None;

    for (line_no, line) in numbered_lines(text) {
        importer.stats.line_count += 1;
        let raw = decode_record(line).map_err(|e| e.at_line(line_no))?;
        importer.stats.max_record_len = importer.stats.max_record_len.max(raw[0]);

        match Command::from_u8(raw[3]) {
            Some(Command::Data) => importer
                .import_data(raw)
                .map_err(|e| e.at_line(line_no))?,
            Some(Command::EndOfFile) => {
                eof = Some(Record::from_raw(raw, 0));
                break;
            }
            Some(Command::ExtendedSegmentAddress) => {
                let value = extended_value(&raw).map_err(|e| e.at_line(line_no))?;
                importer.set_offset(u32::from(value) << 4);
            }
            Some(Command::ExtendedLinearAddress) => {
                let value = extended_value(&raw).map_err(|e| e.at_line(line_no))?;
                importer.set_offset(u32::from(value) << 16);
            }
            Some(Command::StartSegmentAddress | Command::StartAddress) => {
                importer.insert_raw(raw, 0);
            }
            None => return Err(HexError::new(ErrorKind::UnknownCommand).at_line(line_no)),
        }
    }

    let eof = eof.unwrap_or_else(|| {
        log::warn!("input ended without an end-of-file record; synthesizing one");
        importer.warnings.push(Warning::MissingEof);
        Record::end_of_file()
    });
    let outcome = importer.finish(eof);
    log::debug!(
        "imported {} intel-hex lines into {} records",
        outcome.stats.line_count,
        outcome.stats.new_line_count
    );
    Ok(outcome)
}

/// Decodes and validates one `:`-prefixed line into its raw bytes.
fn decode_record(line: &str) -> Result<Vec<u8>, HexError> {
    let body = line
        .strip_prefix(':')
        .ok_or_else(|| HexError::new(ErrorKind::Syntax))?;
    let raw = decode_line(body)?;
    if raw.len() < RECORD_OVERHEAD || raw.len() != usize::from(raw[0]) + RECORD_OVERHEAD {
        return Err(HexError::new(ErrorKind::Syntax));
    }
    if !checksum_intel(&raw) {
        return Err(HexError::new(ErrorKind::Checksum));
    }
    Ok(raw)
}

/// 16-bit payload of an address-extension record.
fn extended_value(raw: &[u8]) -> Result<u16, HexError> {
    match raw {
        [2, _, _, _, hi, lo, _] => Ok(u16::from_be_bytes([*hi, *lo])),
        _ => Err(HexError::new(ErrorKind::Syntax)),
    }
}

impl Importer {
    /// Switches the running offset and records its page.
    fn set_offset(&mut self, offset: u32) {
        self.stats.extended_offset = offset;
        self.ensure_page(offset);
    }

    fn import_data(&mut self, raw: Vec<u8>) -> Result<(), HexError> {
        let offset = self.stats.extended_offset;
        let field = u16::from_be_bytes([raw[1], raw[2]]);
        let len = usize::from(raw[0]);
        let start = checked_start(u64::from(offset) + u64::from(field), len)
            .ok_or_else(|| HexError::new(ErrorKind::Syntax))?;

        let straddles = (start & 0xFFFF) as usize + len > PAGE_SIZE as usize;
        if offset & 0xFFFF != 0 || straddles {
            self.convert_segment_record(start, &raw[4..raw.len() - 1]);
        } else {
            self.insert_raw(raw, start);
        }
        Ok(())
    }

    /// Re-homes a record into linear-page form at absolute `start`.
    fn convert_segment_record(&mut self, start: u32, data: &[u8]) {
        log::trace!("converting record at 0x{start:08X} to linear form");
        self.ensure_page(start);
        self.insert_data(start, data);
    }
}
