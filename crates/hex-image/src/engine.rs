//! The image engine: one loaded file, its records and a cached snapshot.
//!
//! An engine instance is single-threaded. Every structural mutation drops the
//! cached snapshot; the next query rebuilds it from the record store.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::config::ImageConfig;
use crate::dump::{build_snapshot, Snapshot};
use crate::error::{ErrorKind, HexError, Warning};
use crate::import::{import, FileFormat, ImportOutcome};
use crate::query::ByteSpan;
use crate::record::Record;
use crate::repack::{clamp_record_len, repack_blocks, repack_linear};
use crate::serialize::{write_lines, LineIter};
use crate::stats::ImageStats;
use crate::store::RecordStore;

/// Summary of a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Detected input format.
    pub format: FileFormat,
    /// Non-fatal conditions found while loading.
    pub warnings: Vec<Warning>,
}

impl LoadReport {
    /// Returns `true` when the load produced no warnings.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Loads, queries, restructures and writes one firmware image.
#[derive(Debug, Clone, Default)]
pub struct HexImage {
    config: ImageConfig,
    store: RecordStore,
    stats: ImageStats,
    format: Option<FileFormat>,
    snapshot: Option<Snapshot>,
}

impl HexImage {
    /// Creates an empty engine with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty engine with `config`.
    #[must_use]
    pub fn with_config(config: ImageConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ImageConfig {
        &self.config
    }

    /// Replaces the configuration; takes effect on the next load or save.
    pub fn set_config(&mut self, config: ImageConfig) {
        self.config = config;
    }

    /// Drops all records, counters and the cached snapshot.
    pub fn clear(&mut self) {
        self.store.clear();
        self.stats = ImageStats::default();
        self.format = None;
        self.snapshot = None;
    }

    /// Loads the file at `path`, replacing any previous image.
    ///
    /// # Errors
    ///
    /// `Io` when the file cannot be read, otherwise as [`Self::load_str`].
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<LoadReport, HexError> {
        let path = path.as_ref();
        self.clear();
        let bytes = fs::read(path)?;
        log::debug!("loading {} ({} bytes)", path.display(), bytes.len());
        let text = std::str::from_utf8(&bytes).map_err(|_| HexError::new(ErrorKind::Syntax))?;
        self.load_str(text)
    }

    /// Loads an image from any reader.
    ///
    /// # Errors
    ///
    /// `Io` when reading fails, `Syntax` for non-UTF-8 input, otherwise as
    /// [`Self::load_str`].
    pub fn load_reader<R: Read>(&mut self, mut reader: R) -> Result<LoadReport, HexError> {
        self.clear();
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let text = std::str::from_utf8(&bytes).map_err(|_| HexError::new(ErrorKind::Syntax))?;
        self.load_str(text)
    }

    /// Loads an image from text, replacing any previous image.
    ///
    /// The engine is left empty when loading fails. With
    /// [`ImageConfig::validate_on_load`], an address overlay is reported as
    /// [`Warning::Overlay`] and recorded as the last overlay address.
    ///
    /// # Errors
    ///
    /// `NoData` for empty input; `Syntax`, `Checksum` or `UnknownCommand`
    /// with the offending line for malformed input.
    pub fn load_str(&mut self, text: &str) -> Result<LoadReport, HexError> {
        self.clear();
        let (
            format,
            ImportOutcome {
                store,
                stats,
                mut warnings,
            },
        ) = import(text)?;
        self.store = store;
        self.stats = stats;
        self.format = Some(format);

        if self.config.validate_on_load {
            match build_snapshot(&self.store) {
                Ok(snapshot) => self.snapshot = Some(snapshot),
                Err(err) if err.kind == ErrorKind::Overlay => {
                    let address = err.address().unwrap_or_default();
                    self.stats.last_overlay_address = address;
                    warnings.push(Warning::Overlay { address });
                }
                Err(err) if err.kind == ErrorKind::NoData => {
                    log::debug!("loaded image holds no data bytes");
                }
                Err(err) => {
                    self.clear();
                    return Err(err);
                }
            }
        }

        log::debug!(
            "loaded {format:?}: {} bytes in 0x{:08X}..=0x{:08X}, {} warnings",
            self.stats.byte_count,
            self.stats.min_address,
            self.stats.max_address,
            warnings.len()
        );
        Ok(LoadReport { format, warnings })
    }

    /// Writes the image to `path` in the configured format.
    ///
    /// # Errors
    ///
    /// `Io` when the file cannot be created or written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), HexError> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        self.write_to(&mut out)?;
        out.flush()?;
        log::debug!("saved {} records to {}", self.store.len(), path.display());
        Ok(())
    }

    /// Streams the image to `out` in the configured format.
    ///
    /// # Errors
    ///
    /// `Io` when writing fails.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<(), HexError> {
        write_lines(self.lines(), self.config.line_ending, out)?;
        Ok(())
    }

    /// Lazy iterator over the serialized lines in the configured format.
    #[must_use]
    pub fn lines(&self) -> LineIter<'_> {
        LineIter::new(self.store.records(), self.config.output_format)
    }

    /// Records in store order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        self.store.records()
    }

    /// Format detected by the last successful load.
    #[must_use]
    pub const fn format(&self) -> Option<FileFormat> {
        self.format
    }

    /// All counters for the current image.
    #[must_use]
    pub const fn stats(&self) -> &ImageStats {
        &self.stats
    }

    /// Non-empty lines in the original input.
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.stats.line_count
    }

    /// Records currently stored.
    #[must_use]
    pub const fn new_line_count(&self) -> usize {
        self.stats.new_line_count
    }

    /// Lowest occupied address.
    #[must_use]
    pub const fn min_address(&self) -> u32 {
        self.stats.min_address
    }

    /// Highest occupied address (inclusive).
    #[must_use]
    pub const fn max_address(&self) -> u32 {
        self.stats.max_address
    }

    /// Total data bytes.
    #[must_use]
    pub const fn byte_count(&self) -> u32 {
        self.stats.byte_count
    }

    /// Largest record data length.
    #[must_use]
    pub const fn max_record_len(&self) -> u8 {
        self.stats.max_record_len
    }

    /// Address of the most recently detected overlay, or zero.
    #[must_use]
    pub const fn last_overlay_address(&self) -> u32 {
        self.stats.last_overlay_address
    }

    /// Returns the snapshot, rebuilding it if the store changed since the last build.
    ///
    /// # Errors
    ///
    /// `Overlay` (also recorded as the last overlay address), `OutOfMemory`,
    /// or `NoData`.
    pub fn get_data_dump(&mut self) -> Result<&Snapshot, HexError> {
        self.ensure_snapshot()?;
        self.snapshot
            .as_ref()
            .ok_or_else(|| HexError::new(ErrorKind::NoData))
    }

    fn ensure_snapshot(&mut self) -> Result<(), HexError> {
        if self.snapshot.is_some() {
            return Ok(());
        }
        match build_snapshot(&self.store) {
            Ok(snapshot) => {
                self.snapshot = Some(snapshot);
                Ok(())
            }
            Err(err) => {
                if let (ErrorKind::Overlay, Some(address)) = (&err.kind, err.address()) {
                    self.stats.last_overlay_address = address;
                }
                Err(err)
            }
        }
    }

    /// Reads up to `count` bytes at `address` without crossing a gap.
    ///
    /// # Errors
    ///
    /// Snapshot errors from [`Self::get_data_dump`], or `NotFound` when
    /// `address` is not occupied.
    pub fn get_bytes_at(&mut self, address: u32, count: usize) -> Result<ByteSpan, HexError> {
        self.get_data_dump()?.read_bytes(address, count)
    }

    /// Finds `pattern` at or after `start_address` within its block.
    ///
    /// # Errors
    ///
    /// Snapshot errors from [`Self::get_data_dump`], or `NotFound`.
    pub fn find_pattern(&mut self, start_address: u32, pattern: &[u8]) -> Result<u32, HexError> {
        self.get_data_dump()?.find_pattern(start_address, pattern)
    }

    /// Re-packs the occupied blocks into records of `record_size` bytes
    /// (clamped to `[8, 255]`).
    ///
    /// # Errors
    ///
    /// Snapshot errors from [`Self::get_data_dump`]. The image is unchanged on
    /// error.
    pub fn optimize(&mut self, record_size: usize) -> Result<(), HexError> {
        let record_len = clamp_record_len(record_size);
        self.ensure_snapshot()?;
        let Some(snapshot) = &self.snapshot else {
            return Err(HexError::new(ErrorKind::NoData));
        };
        let store = repack_blocks(snapshot, &self.store, record_len);
        self.replace_store(store);
        Ok(())
    }

    /// Re-packs through a flat image of the whole address span, optionally
    /// filling gaps with `fill`.
    ///
    /// # Errors
    ///
    /// `NoData`, `OutOfMemory`, or `Overlay` (also recorded as the last
    /// overlay address). The image is unchanged on error.
    pub fn optimize_linear(&mut self, record_size: usize, fill: Option<u8>) -> Result<(), HexError> {
        let record_len = clamp_record_len(record_size);
        match repack_linear(&self.store, record_len, fill) {
            Ok(store) => {
                self.replace_store(store);
                Ok(())
            }
            Err(err) => {
                if let (ErrorKind::Overlay, Some(address)) = (&err.kind, err.address()) {
                    self.stats.last_overlay_address = address;
                }
                Err(err)
            }
        }
    }

    fn replace_store(&mut self, store: RecordStore) {
        self.store = store;
        self.snapshot = None;
        self.stats.recompute(self.store.iter());
        log::debug!(
            "image now holds {} records, largest {} bytes",
            self.stats.new_line_count,
            self.stats.max_record_len
        );
    }
}
