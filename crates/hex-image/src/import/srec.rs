//! Motorola S-Record import.
//!
//! Data records (`S1`/`S2`/`S3`) are translated into the internal data form
//! under linear page records. A non-zero entry address from a termination
//! record (`S7`/`S8`/`S9`) becomes a start-linear-address record. Header and
//! count records carry no image data and are skipped.

use crate::codec::{checksum_srecord, decode_line};
use crate::error::{ErrorKind, HexError};
use crate::import::{checked_start, numbered_lines, ImportOutcome, Importer};
use crate::record::{Command, Record};

/// Width in bytes of the address field for a data record type, if any.
const fn address_width(kind: u8) -> Option<usize> {
    match kind {
        b'1' => Some(2),
        b'2' => Some(3),
        b'3' => Some(4),
        _ => None,
    }
}

/// Width in bytes of the entry address for a termination record type, if any.
const fn entry_width(kind: u8) -> Option<usize> {
    match kind {
        b'9' => Some(2),
        b'8' => Some(3),
        b'7' => Some(4),
        _ => None,
    }
}

/// Splits `raw` into its big-endian address and the data after it.
fn split_address(raw: &[u8], width: usize) -> Option<(u32, &[u8])> {
    if raw.len() < width + 2 {
        return None;
    }
    let address = raw[1..=width]
        .iter()
        .fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
    Some((address, &raw[width + 1..raw.len() - 1]))
}

/// Imports Motorola S-Record `text`.
///
/// A terminator is always appended at the end of input. The entry address of
/// the last termination record is kept when it is non-zero.
///
/// # Errors
///
/// - `Syntax` for malformed lines, short records, or data past 4 GiB.
/// - `Checksum` when the ones'-complement sum is not `0xFF`.
///
/// Every error carries the offending line number.
pub fn import_srecord(text: &str) -> Result<ImportOutcome, HexError> {
    let mut importer = Importer::new();
    let mut current_page = None;
    let mut entry = 0u32;

    for (line_no, line) in numbered_lines(text) {
        importer.stats.line_count += 1;
        let (kind, raw) = decode_record(line).map_err(|e| e.at_line(line_no))?;
        let short = || HexError::new(ErrorKind::Syntax).at_line(line_no);

        if let Some(width) = entry_width(kind) {
            entry = split_address(&raw, width).ok_or_else(short)?.0;
            continue;
        }
        let Some(width) = address_width(kind) else {
            log::trace!("line {line_no}: skipping S{} record", char::from(kind));
            continue;
        };
        let (address, data) = split_address(&raw, width).ok_or_else(short)?;
        let start = checked_start(u64::from(address), data.len()).ok_or_else(short)?;

        if let Ok(len) = u8::try_from(data.len()) {
            importer.stats.max_record_len = importer.stats.max_record_len.max(len);
        }
        let page = start >> 16;
        if current_page != Some(page) {
            importer.ensure_page(start);
            current_page = Some(page);
        }
        importer.insert_data(start, data);
    }

    if entry != 0 {
        log::trace!("entry address 0x{entry:08X}");
        importer.store.insert_sorted(Record::new(
            Command::StartAddress.as_u8(),
            0,
            &entry.to_be_bytes(),
            0,
        ));
    }
    let outcome = importer.finish(Record::end_of_file());
    log::debug!(
        "imported {} s-record lines into {} records",
        outcome.stats.line_count,
        outcome.stats.new_line_count
    );
    Ok(outcome)
}

/// Decodes one `S`-prefixed line into its type digit and raw bytes.
fn decode_record(line: &str) -> Result<(u8, Vec<u8>), HexError> {
    let bytes = line.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'S' {
        return Err(HexError::new(ErrorKind::Syntax));
    }
    let body = line
        .get(2..)
        .ok_or_else(|| HexError::new(ErrorKind::Syntax))?;
    let raw = decode_line(body)?;
    if raw.is_empty() || raw.len() != usize::from(raw[0]) + 1 {
        return Err(HexError::new(ErrorKind::Syntax));
    }
    if !checksum_srecord(&raw) {
        return Err(HexError::new(ErrorKind::Checksum));
    }
    Ok((bytes[1], raw))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::import_srecord;
    use crate::config::OutputFormat;
    use crate::error::ErrorKind;
    use crate::record::{Command, Record};
    use crate::serialize::LineIter;

    fn lines(text: &str) -> Vec<String> {
        import_srecord(text)
            .expect("import")
            .store
            .iter()
            .map(Record::to_intel_line)
            .collect()
    }

    #[test]
    fn s1_records_map_to_page_zero() {
        let text = "S00600004844521B\nS1060010AABBCCB0\nS9030000FC\n";
        assert_eq!(lines(text), vec![":03001000AABBCCC4", ":00000001FF"]);
    }

    #[test]
    fn s3_records_get_page_records() {
        let text = "S30A080000001122334455EE\nS70508000000F2\n";
        let outcome = import_srecord(text).unwrap();
        let got: Vec<String> = outcome.store.iter().map(Record::to_intel_line).collect();
        assert_eq!(
            got,
            vec![
                ":020000040800F2",
                ":050000001122334455FC",
                ":0400000508000000EF",
                ":00000001FF",
            ]
        );
        assert_eq!(outcome.stats.min_address, 0x0800_0000);
        assert_eq!(outcome.stats.max_address, 0x0800_0004);
        assert_eq!(outcome.stats.max_record_len, 5);
        assert_eq!(outcome.stats.line_count, 2);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn s2_record_straddling_a_page_is_split() {
        let text = "S20801FFFE01020304E7\n";
        assert_eq!(
            lines(text),
            vec![
                ":020000040001F9",
                ":02FFFE000102FE",
                ":020000040002F8",
                ":020000000304F7",
                ":00000001FF",
            ]
        );
    }

    #[test]
    fn terminator_is_always_appended() {
        let outcome = import_srecord("S1040000AA51\n").unwrap();
        assert!(outcome.warnings.is_empty());
        assert!(outcome.store.records().last().is_some_and(Record::is_end_of_file));
    }

    #[rstest]
    #[case("S70508000100F1\n", 0x0800_0100)]
    #[case("S80401234592\n", 0x0001_2345)]
    #[case("S9031000EC\n", 0x1000)]
    fn termination_entry_becomes_start_record(#[case] text: &str, #[case] entry: u32) {
        let outcome = import_srecord(text).unwrap();
        let records = outcome.store.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].command(), Some(Command::StartAddress));
        assert_eq!(records[0].payload(), entry.to_be_bytes());
        assert!(records[1].is_end_of_file());
    }

    #[test]
    fn srecord_entry_survives_srecord_output() {
        let outcome = import_srecord("S1040000AA51\nS70508000000F2\n").unwrap();
        let lines: Vec<String> =
            LineIter::new(outcome.store.records(), OutputFormat::SRecord).collect();
        assert_eq!(lines.last().map(String::as_str), Some("S70508000000F2"));
    }

    #[rstest]
    #[case("S1040000AA50\n", ErrorKind::Checksum, 1)]
    #[case("S1040000AA\n", ErrorKind::Syntax, 1)]
    #[case("S1040000AA51\n:00000001FF\n", ErrorKind::Syntax, 2)]
    #[case("S10200FD\n", ErrorKind::Syntax, 1)]
    #[case("S1040000ZZ51\n", ErrorKind::Syntax, 1)]
    #[case("S1040000AA51\nS90200FD\n", ErrorKind::Syntax, 2)]
    fn malformed_lines_report_kind_and_line(
        #[case] text: &str,
        #[case] kind: ErrorKind,
        #[case] line: usize,
    ) {
        let err = import_srecord(text).unwrap_err();
        assert_eq!(err.kind, kind);
        assert_eq!(err.line(), Some(line));
    }
}
