//! Per-load counters kept by the engine.

use crate::record::Record;

/// Counters describing the currently loaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ImageStats {
    /// Lowest occupied address.
    pub min_address: u32,
    /// Highest occupied address (inclusive).
    pub max_address: u32,
    /// Non-empty lines read from the original input.
    pub line_count: usize,
    /// Records in the store after internal splitting and page insertion.
    pub new_line_count: usize,
    /// Largest data length seen in a single record.
    pub max_record_len: u8,
    /// Total data bytes.
    pub byte_count: u32,
    /// Current 32-bit offset from the last address-extension record.
    pub extended_offset: u32,
    /// Address of the most recent overlay, or zero.
    pub last_overlay_address: u32,
}

impl ImageStats {
    /// Accounts for `len` data bytes starting at `address`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn record_data(&mut self, address: u32, len: usize) {
        if len == 0 {
            return;
        }
        let last = address.saturating_add(len as u32 - 1);
        if self.byte_count == 0 {
            self.min_address = address;
            self.max_address = last;
        } else {
            self.min_address = self.min_address.min(address);
            self.max_address = self.max_address.max(last);
        }
        self.byte_count = self.byte_count.saturating_add(len as u32);
    }

    /// Recomputes address and size counters from `records`, keeping the
    /// original line count and overlay address.
    pub fn recompute<'a>(&mut self, records: impl IntoIterator<Item = &'a Record>) {
        let line_count = self.line_count;
        let last_overlay_address = self.last_overlay_address;
        *self = Self {
            line_count,
            last_overlay_address,
            ..Self::default()
        };
        for record in records {
            self.new_line_count += 1;
            if record.is_data() {
                self.max_record_len = self.max_record_len.max(record.len());
                self.record_data(record.line_address(), record.payload().len());
            }
        }
    }
}
