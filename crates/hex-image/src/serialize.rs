//! Line-oriented re-serialization of a record store.
//!
//! [`LineIter`] is lazy and forward-only. Intel-HEX output is rebuilt from
//! each record's raw bytes; S-Record output derives absolute addresses from
//! the page records it walks past.

use std::io::{self, Write};
use std::slice::Iter as SliceIter;

use crate::codec::{encode_byte, srecord_checksum};
use crate::config::{LineEnding, OutputFormat};
use crate::record::{Command, Record};

/// Largest data length an `S3` line can carry (count byte minus address and checksum).
pub const S3_MAX_DATA: usize = u8::MAX as usize - 5;

/// Lazy iterator over serialized lines, without terminators.
#[derive(Debug, Clone)]
pub struct LineIter<'a> {
    records: SliceIter<'a, Record>,
    format: OutputFormat,
    page: u32,
    entry: u32,
    pending: Option<(u32, &'a [u8])>,
}

impl<'a> LineIter<'a> {
    /// Starts iterating `records` in store order.
    #[must_use]
    pub fn new(records: &'a [Record], format: OutputFormat) -> Self {
        Self {
            records: records.iter(),
            format,
            page: 0,
            entry: 0,
            pending: None,
        }
    }

    /// Returns the next line, or `None` once every record has been emitted.
    pub fn next_line_string(&mut self) -> Option<String> {
        match self.format {
            OutputFormat::IntelHex => self.records.next().map(Record::to_intel_line),
            OutputFormat::SRecord => self.next_srecord(),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn next_srecord(&mut self) -> Option<String> {
        loop {
            if let Some((address, data)) = self.pending.take() {
                let (chunk, rest) = data.split_at(data.len().min(S3_MAX_DATA));
                if !rest.is_empty() {
                    self.pending = Some((address.wrapping_add(chunk.len() as u32), rest));
                }
                return Some(srecord_line(b'3', &address.to_be_bytes(), chunk));
            }

            let record = self.records.next()?;
            match (record.command(), record.payload()) {
                (Some(Command::ExtendedLinearAddress), _) => {
                    if let Some(base) = record.page_base() {
                        self.page = base;
                    }
                }
                (Some(Command::Data), data) if !data.is_empty() => {
                    self.pending = Some((self.page | u32::from(record.address_field()), data));
                }
                (Some(Command::StartAddress), &[a, b, c, d]) => {
                    self.entry = u32::from_be_bytes([a, b, c, d]);
                }
                (Some(Command::StartSegmentAddress), &[cs_hi, cs_lo, ip_hi, ip_lo]) => {
                    let cs = u32::from(u16::from_be_bytes([cs_hi, cs_lo]));
                    let ip = u32::from(u16::from_be_bytes([ip_hi, ip_lo]));
                    self.entry = (cs << 4).wrapping_add(ip);
                }
                (Some(Command::EndOfFile), _) => {
                    return Some(srecord_line(b'7', &self.entry.to_be_bytes(), &[]));
                }
                _ => {}
            }
        }
    }
}

impl Iterator for LineIter<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line_string()
    }
}

/// Formats one S-Record line of type `kind`.
#[allow(clippy::cast_possible_truncation)]
fn srecord_line(kind: u8, address: &[u8], data: &[u8]) -> String {
    let mut body = Vec::with_capacity(1 + address.len() + data.len());
    body.push((address.len() + data.len() + 1) as u8);
    body.extend_from_slice(address);
    body.extend_from_slice(data);

    let mut line = String::with_capacity(4 + body.len() * 2);
    line.push('S');
    line.push(char::from(kind));
    for byte in &body {
        encode_byte(&mut line, *byte);
    }
    encode_byte(&mut line, srecord_checksum(&body));
    line
}

/// Writes every line from `lines` to `out`, each followed by `ending`.
///
/// # Errors
///
/// Propagates write failures from `out`.
pub fn write_lines<W: Write>(lines: LineIter<'_>, ending: LineEnding, out: &mut W) -> io::Result<()> {
    for line in lines {
        out.write_all(line.as_bytes())?;
        out.write_all(ending.as_str().as_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{write_lines, LineIter, S3_MAX_DATA};
    use crate::codec::{checksum_srecord, decode_line};
    use crate::config::{LineEnding, OutputFormat};
    use crate::record::{Command, Record};

    fn sample() -> Vec<Record> {
        vec![
            Record::data(0x10, &[0x01, 0x02]),
            Record::extended_linear(0x0800),
            Record::data(0x0800_0000, &[0xAA]),
            Record::new(Command::StartAddress.as_u8(), 0, &[0x08, 0x00, 0x01, 0x00], 0),
            Record::end_of_file(),
        ]
    }

    #[test]
    fn intel_lines_follow_store_order() {
        let records = sample();
        let lines: Vec<String> = LineIter::new(&records, OutputFormat::IntelHex).collect();
        assert_eq!(
            lines,
            vec![
                ":020010000102EB",
                ":020000040800F2",
                ":01000000AA55",
                ":0400000508000100EE",
                ":00000001FF",
            ]
        );
    }

    #[test]
    fn srecord_lines_use_absolute_addresses() {
        let records = sample();
        let lines: Vec<String> = LineIter::new(&records, OutputFormat::SRecord).collect();
        assert_eq!(
            lines,
            vec![
                "S307000000100102E5",
                "S30608000000AA47",
                "S70508000100F1",
            ]
        );
        for line in &lines {
            assert!(checksum_srecord(&decode_line(&line[2..]).unwrap()));
        }
    }

    #[test]
    fn long_records_split_into_several_s3_lines() {
        let data = vec![0x5A; 255];
        let records = vec![Record::data(0x100, &data), Record::end_of_file()];
        let lines: Vec<String> = LineIter::new(&records, OutputFormat::SRecord).collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("S3FF00000100"));
        assert!(lines[1].starts_with(&format!("S30A{:08X}", 0x100 + S3_MAX_DATA)));
        assert!(lines[2].starts_with("S705"));
    }

    #[test]
    fn write_lines_appends_terminators() {
        let records = vec![Record::end_of_file()];
        let mut out = Vec::new();
        write_lines(
            LineIter::new(&records, OutputFormat::IntelHex),
            LineEnding::CrLf,
            &mut out,
        )
        .unwrap();
        assert_eq!(out, b":00000001FF\r\n");
    }
}
