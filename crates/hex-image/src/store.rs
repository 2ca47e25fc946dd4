//! Address-ordered record store with an insertion cursor.
//!
//! Records are kept sorted by [`Record::sort_key`]. The cursor remembers the
//! most recently inserted position, so monotonically increasing input appends
//! in amortized O(1); out-of-order input degrades to a linear walk.

use std::slice::Iter as SliceIter;

use crate::record::Record;

/// Outcome of looking up where a page record for an address belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageSlot {
    /// Page zero is implicit and never needs a record.
    NotNeeded,
    /// A page record for this page is already stored.
    Exists,
    /// No page record exists; one belongs at this index.
    Vacant(usize),
}

/// Sorted sequence of records rooted at index zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordStore {
    records: Vec<Record>,
    last_insert_position: usize,
}

impl RecordStore {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
            last_insert_position: 0,
        }
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of the most recently touched record.
    #[must_use]
    pub const fn last_insert_position(&self) -> usize {
        self.last_insert_position
    }

    /// Record at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Iterates records in store order.
    pub fn iter(&self) -> SliceIter<'_, Record> {
        self.records.iter()
    }

    /// All records in store order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Finds the index a record with `key` should be spliced in at.
    ///
    /// Walks backward from the cursor while the stored key exceeds `key`, then
    /// forward while the next key is still less than or equal to it.
    fn locate(&self, key: (u32, u8)) -> usize {
        if self.records.is_empty() {
            return 0;
        }
        let mut pos = self.last_insert_position.min(self.records.len() - 1);
        while pos > 0 && self.records[pos].sort_key() > key {
            pos -= 1;
        }
        if self.records[pos].sort_key() > key {
            return 0;
        }
        while pos + 1 < self.records.len() && self.records[pos + 1].sort_key() <= key {
            pos += 1;
        }
        pos + 1
    }

    /// Inserts `record` keeping address order and returns its index.
    ///
    /// Records with equal keys keep insertion order.
    pub fn insert_sorted(&mut self, record: Record) -> usize {
        let index = self.locate(record.sort_key());
        log::trace!(
            "insert {:?} at {index} (cursor {})",
            record.sort_key(),
            self.last_insert_position
        );
        self.records.insert(index, record);
        self.last_insert_position = index;
        index
    }

    /// Looks up where a page record for `address` belongs.
    ///
    /// Moves the cursor to the located position.
    pub fn position_before_extended_address(&mut self, address: u32) -> PageSlot {
        let base = address & 0xFFFF_0000;
        if base == 0 {
            return PageSlot::NotNeeded;
        }
        let index = self.locate((base, 0));
        if index > 0 {
            self.last_insert_position = index - 1;
            let prev = &self.records[index - 1];
            if prev.is_extended_linear() && prev.line_address() == base {
                return PageSlot::Exists;
            }
        }
        PageSlot::Vacant(index)
    }

    /// Inserts a page record for `address` unless one is present or not needed.
    ///
    /// Returns `true` when a record was inserted.
    #[allow(clippy::cast_possible_truncation)]
    pub fn insert_extended_address(&mut self, address: u32) -> bool {
        match self.position_before_extended_address(address) {
            PageSlot::Vacant(index) => {
                self.records
                    .insert(index, Record::extended_linear((address >> 16) as u16));
                self.last_insert_position = index;
                true
            }
            PageSlot::NotNeeded | PageSlot::Exists => false,
        }
    }

    /// Removes the entry record, fixing up the cursor.
    pub fn remove_first(&mut self) -> Option<Record> {
        if self.records.is_empty() {
            return None;
        }
        let first = self.records.remove(0);
        self.last_insert_position = self.last_insert_position.saturating_sub(1);
        Some(first)
    }

    /// Releases all records.
    pub fn clear(&mut self) {
        self.records.clear();
        self.last_insert_position = 0;
    }

    /// Returns `true` when every data and page record is in non-decreasing
    /// address order and at most one terminator exists, in last position.
    #[must_use]
    pub fn is_address_ordered(&self) -> bool {
        let addressed_sorted = self
            .records
            .iter()
            .filter(|r| r.is_data() || r.is_extended_linear())
            .zip(
                self.records
                    .iter()
                    .filter(|r| r.is_data() || r.is_extended_linear())
                    .skip(1),
            )
            .all(|(prev, next)| next.line_address() >= prev.line_address());
        let eof_count = self.records.iter().filter(|r| r.is_end_of_file()).count();
        let eof_last = self.records.last().is_some_and(Record::is_end_of_file);
        addressed_sorted && (eof_count == 0 || (eof_count == 1 && eof_last))
    }
}

impl<'a> IntoIterator for &'a RecordStore {
    type Item = &'a Record;
    type IntoIter = SliceIter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
