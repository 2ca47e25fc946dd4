//! Error and warning taxonomy for the image engine.
//!
//! Fatal results carry an [`ErrorKind`] plus an optional [`ErrorContext`]
//! naming the offending source line or memory address. Non-fatal results are
//! reported as [`Warning`] values alongside successful output.

use std::fmt;

use thiserror::Error;

/// Classification of fatal engine errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    /// Malformed record text (bad prefix, non-hex digit, length mismatch).
    #[error("malformed record syntax")]
    Syntax,
    /// Record checksum does not match its contents.
    #[error("record checksum mismatch")]
    Checksum,
    /// Record type or command byte is not recognised.
    #[error("unknown record command")]
    UnknownCommand,
    /// Buffer allocation for an image failed.
    #[error("not enough memory for image buffer")]
    OutOfMemory,
    /// Operation requires data but the image holds none.
    #[error("image contains no data")]
    NoData,
    /// Two records claim the same byte address.
    #[error("address overlay")]
    Overlay,
    /// Underlying file or stream failure.
    #[error("I/O error: {0}")]
    Io(String),
    /// Query did not match any stored data.
    #[error("address or pattern not found")]
    NotFound,
}

/// Location attached to an error for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorContext {
    /// 1-indexed physical line in the input text.
    Line(usize),
    /// Absolute 32-bit memory address.
    Address(u32),
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line(line) => write!(f, "line {line}"),
            Self::Address(address) => write!(f, "address 0x{address:08X}"),
        }
    }
}

/// A fatal engine error with optional line or address context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexError {
    /// The kind of error.
    pub kind: ErrorKind,
    /// Source line or address, when known.
    pub context: Option<ErrorContext>,
}

impl HexError {
    /// Creates an error without context.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Attaches a 1-indexed source line.
    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        self.context = Some(ErrorContext::Line(line));
        self
    }

    /// Attaches an absolute address.
    #[must_use]
    pub fn at_address(mut self, address: u32) -> Self {
        self.context = Some(ErrorContext::Address(address));
        self
    }

    /// Returns the attached line number, if any.
    #[must_use]
    pub const fn line(&self) -> Option<usize> {
        match self.context {
            Some(ErrorContext::Line(line)) => Some(line),
            _ => None,
        }
    }

    /// Returns the attached address, if any.
    #[must_use]
    pub const fn address(&self) -> Option<u32> {
        match self.context {
            Some(ErrorContext::Address(address)) => Some(address),
            _ => None,
        }
    }
}

impl fmt::Display for HexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{context}: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for HexError {}

impl From<ErrorKind> for HexError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<std::io::Error> for HexError {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorKind::Io(e.to_string()))
    }
}

/// Non-fatal condition reported by an operation that still completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Warning {
    /// Input ended without a terminating record; one was synthesized.
    #[error("missing end-of-file record")]
    MissingEof,
    /// Two records claim the same byte address.
    #[error("address overlay at 0x{address:08X}")]
    Overlay {
        /// First address claimed twice.
        address: u32,
    },
}
