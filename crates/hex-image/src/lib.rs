//! Intel-HEX and Motorola S-Record firmware image engine.
//!
//! Loads a text image into an address-ordered record store, exposes a
//! gap-preserving byte snapshot for queries, re-packs records, and writes the
//! result back out as Intel-HEX or S-Record text.

/// Error kinds, error context and load warnings.
pub mod error;
pub use error::{ErrorContext, ErrorKind, HexError, Warning};

/// Hex-pair text codec and record checksums.
pub mod codec;
pub use codec::{checksum_intel, checksum_srecord, decode_line};

/// Intel-HEX record model.
pub mod record;
pub use record::{Command, Record, PAGE_SIZE, RECORD_OVERHEAD};

/// Address-ordered record storage with an insertion cursor.
pub mod store;
pub use store::{PageSlot, RecordStore};

/// Address and size counters.
pub mod stats;
pub use stats::ImageStats;

/// Format sniffing and Intel-HEX / S-Record import.
pub mod import;
pub use import::{import, import_intel, import_srecord, sniff_format, FileFormat, ImportOutcome};

/// Gap-preserving byte snapshot of a record store.
pub mod dump;
pub use dump::{build_snapshot, Block, Snapshot};

/// Byte reads and pattern search over a snapshot.
pub mod query;
pub use query::ByteSpan;

/// Record re-packing by block or through a flat image.
pub mod repack;
pub use repack::{clamp_record_len, repack_blocks, repack_linear, MAX_RECORD_LEN, MIN_RECORD_LEN};

/// Engine configuration.
pub mod config;
pub use config::{ImageConfig, LineEnding, OutputFormat};

/// Line serialization to Intel-HEX or S-Record text.
pub mod serialize;
pub use serialize::{write_lines, LineIter, S3_MAX_DATA};

/// The image engine.
pub mod engine;
pub use engine::{HexImage, LoadReport};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use tempfile as _;
