//! Engine configuration.

/// Text format produced by the serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum OutputFormat {
    /// Intel-HEX lines rebuilt from each record's raw form.
    #[default]
    IntelHex,
    /// Motorola `S3` data records followed by an `S7` terminator.
    SRecord,
}

/// Line terminator written after each serialized record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    /// Terminator text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// Top-level configuration for an engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ImageConfig {
    /// Format used by `save` and `write_to`.
    pub output_format: OutputFormat,
    /// Terminator written after each line.
    pub line_ending: LineEnding,
    /// Builds the snapshot during load so overlays surface immediately.
    pub validate_on_load: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::IntelHex,
            line_ending: LineEnding::Lf,
            validate_on_load: true,
        }
    }
}
