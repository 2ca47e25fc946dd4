//! Decoded record representation.

use crate::codec::{encode_byte, recompute_checksum};

/// Size in bytes of one extended-address page.
pub const PAGE_SIZE: u32 = 0x1_0000;

/// Number of framing bytes around record data (length, address, command, checksum).
pub const RECORD_OVERHEAD: usize = 5;

/// Intel-HEX record commands interpreted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Data bytes at a 16-bit address within the current page.
    Data = 0x00,
    /// Terminating record.
    EndOfFile = 0x01,
    /// Legacy 16-bit segment base (`value << 4`).
    ExtendedSegmentAddress = 0x02,
    /// Legacy start segment address, preserved verbatim.
    StartSegmentAddress = 0x03,
    /// Upper 16 bits of the 32-bit address (`value << 16`).
    ExtendedLinearAddress = 0x04,
    /// Start linear address, preserved verbatim.
    StartAddress = 0x05,
}

impl Command {
    /// Highest command byte accepted by the Intel-HEX importer.
    pub const MAX: u8 = Self::StartAddress as u8;

    /// Converts a command byte into a known command.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Data),
            0x01 => Some(Self::EndOfFile),
            0x02 => Some(Self::ExtendedSegmentAddress),
            0x03 => Some(Self::StartSegmentAddress),
            0x04 => Some(Self::ExtendedLinearAddress),
            0x05 => Some(Self::StartAddress),
            _ => None,
        }
    }

    /// Returns the command byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// One decoded record line.
///
/// The raw form `[length, addr_hi, addr_lo, command, data..., checksum]` is
/// kept for exact re-serialization. `line_address` is derived at import time
/// and is only meaningful for data and extended-linear-address records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    raw: Vec<u8>,
    line_address: u32,
}

impl Record {
    /// Wraps an already decoded raw record.
    ///
    /// The caller guarantees `raw.len() == raw[0] + 5` and a valid checksum.
    #[must_use]
    pub const fn from_raw(raw: Vec<u8>, line_address: u32) -> Self {
        Self { raw, line_address }
    }

    /// Builds a record from its fields and computes its checksum.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(command: u8, address_field: u16, data: &[u8], line_address: u32) -> Self {
        debug_assert!(data.len() <= usize::from(u8::MAX));
        let [hi, lo] = address_field.to_be_bytes();
        let mut raw = Vec::with_capacity(data.len() + RECORD_OVERHEAD);
        raw.extend_from_slice(&[data.len() as u8, hi, lo, command]);
        raw.extend_from_slice(data);
        raw.push(0);
        recompute_checksum(&mut raw);
        Self { raw, line_address }
    }

    /// Builds a data record for an absolute address.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn data(address: u32, data: &[u8]) -> Self {
        Self::new(Command::Data.as_u8(), address as u16, data, address)
    }

    /// Builds an extended-linear-address record selecting `page`.
    #[must_use]
    pub fn extended_linear(page: u16) -> Self {
        Self::new(
            Command::ExtendedLinearAddress.as_u8(),
            0,
            &page.to_be_bytes(),
            u32::from(page) << 16,
        )
    }

    /// Builds the terminating record.
    #[must_use]
    pub fn end_of_file() -> Self {
        Self::new(Command::EndOfFile.as_u8(), 0, &[], 0)
    }

    /// Raw bytes including length prefix and checksum.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Declared data length.
    #[must_use]
    pub fn len(&self) -> u8 {
        self.raw[0]
    }

    /// Returns `true` when the record carries no data bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 16-bit address field.
    #[must_use]
    pub fn address_field(&self) -> u16 {
        u16::from_be_bytes([self.raw[1], self.raw[2]])
    }

    /// Command byte as stored.
    #[must_use]
    pub fn command_byte(&self) -> u8 {
        self.raw[3]
    }

    /// Interpreted command, if known.
    #[must_use]
    pub fn command(&self) -> Option<Command> {
        Command::from_u8(self.command_byte())
    }

    /// Data bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.raw[4..self.raw.len() - 1]
    }

    /// Stored checksum byte.
    #[must_use]
    pub fn checksum(&self) -> u8 {
        self.raw[self.raw.len() - 1]
    }

    /// Derived absolute address (data and extended-linear records only).
    #[must_use]
    pub const fn line_address(&self) -> u32 {
        self.line_address
    }

    /// Returns `true` for data records.
    #[must_use]
    pub fn is_data(&self) -> bool {
        self.command() == Some(Command::Data)
    }

    /// Returns `true` for extended-linear-address records.
    #[must_use]
    pub fn is_extended_linear(&self) -> bool {
        self.command() == Some(Command::ExtendedLinearAddress)
    }

    /// Returns `true` for the terminating record.
    #[must_use]
    pub fn is_end_of_file(&self) -> bool {
        self.command() == Some(Command::EndOfFile)
    }

    /// Page base selected by an extended-linear-address record.
    #[must_use]
    pub fn page_base(&self) -> Option<u32> {
        match self.payload() {
            [hi, lo] if self.is_extended_linear() => {
                Some(u32::from(u16::from_be_bytes([*hi, *lo])) << 16)
            }
            _ => None,
        }
    }

    /// Ordering key within a record store.
    ///
    /// Addressed records order by address with page records first on ties.
    /// Everything else trails, with the terminator last.
    #[must_use]
    pub fn sort_key(&self) -> (u32, u8) {
        match self.command() {
            Some(Command::ExtendedLinearAddress) => (self.line_address, 0),
            Some(Command::Data) => (self.line_address, 1),
            Some(Command::EndOfFile) => (u32::MAX, 3),
            _ => (u32::MAX, 2),
        }
    }

    /// Formats the record as an Intel-HEX line without line terminator.
    #[must_use]
    pub fn to_intel_line(&self) -> String {
        let mut line = String::with_capacity(1 + self.raw.len() * 2);
        line.push(':');
        for byte in &self.raw {
            encode_byte(&mut line, *byte);
        }
        line
    }
}
