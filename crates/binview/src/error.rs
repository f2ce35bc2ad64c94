//! Error types for binary view operations
//!
//! Every failure is surfaced at the point of detection. Nothing is retried;
//! re-opening a file or re-fetching bytes is left to the caller.

use crate::codec::LengthPrefix;
use thiserror::Error;

/// Binary view error type
#[derive(Debug, Error)]
pub enum BinViewError {
    /// Seek or construction outside the valid bounds of a stream
    #[error("range error: offset {offset} + length {length} exceeds bound {bound}")]
    Range {
        /// Requested start offset
        offset: u64,
        /// Requested length
        length: u64,
        /// Upper bound that was exceeded
        bound: u64,
    },

    /// Attempt to pop the sentinel base entry off the section stack
    #[error("section stack underflow: the base stream cannot be popped")]
    Underflow,

    /// A declared length points past the bytes actually available
    #[error("truncated stream: declared {declared} bytes, only {available} available")]
    TruncatedStream {
        /// Length declared by a prefix
        declared: u64,
        /// Bytes remaining in the active cursor
        available: u64,
    },

    /// Malformed compressed data or an invalid encoded value
    #[error("corrupt data: {0}")]
    CorruptData(String),

    /// Primitive read past the real end of an unbounded stream
    #[error("unexpected end of stream")]
    EndOfStream,

    /// Value does not fit in the selected length-prefix width
    #[error("length {length} does not fit in a {prefix:?} length prefix")]
    LengthOverflow {
        /// Length that was to be written
        length: u64,
        /// Selected prefix width
        prefix: LengthPrefix,
    },

    /// Caller-supplied element count disagrees with the stored prefix
    #[error("length mismatch: expected {expected} elements, stream declares {declared}")]
    LengthMismatch {
        /// Count supplied by the caller
        expected: u64,
        /// Count read from the prefix
        declared: u64,
    },

    /// Reading an unprefixed sequence without an out-of-band count
    #[error("no length prefix and no expected element count")]
    MissingElementCount,

    /// Prefix width that a string metadata byte cannot express
    #[error("unsupported string length prefix: {0:?}")]
    UnsupportedLayout(LengthPrefix),

    /// Character outside the 16-bit character unit
    #[error("character U+{code:04X} does not fit in a 16-bit unit")]
    CharOutOfRange {
        /// Scalar value of the rejected character
        code: u32,
    },

    /// Inflated payload exceeds the configured limit
    #[error("decompressed size exceeds limit of {limit} bytes")]
    DecompressionLimit {
        /// Configured maximum
        limit: usize,
    },

    /// Ending a section whose kind does not match the top of the stack
    #[error("section mismatch: expected {expected}, found {found}")]
    SectionMismatch {
        /// Kind the operation expected
        expected: &'static str,
        /// Kind actually on top of the stack
        found: &'static str,
    },

    /// Operation not allowed in the current stack state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Writer finished while sections were still open
    #[error("{0} section(s) still open")]
    UnclosedSections(usize),

    /// Opaque payload serializer failure
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Reader or writer used after close
    #[error("binary view is closed")]
    Closed,

    /// I/O error from the underlying device
    #[error("I/O error: {0}")]
    Io(std::io::Error),
}

/// Result type for binary view operations
pub type BinViewResult<T> = Result<T, BinViewError>;

impl BinViewError {
    /// Create a corrupt data error with a reason
    pub fn corrupt<S: Into<String>>(reason: S) -> Self {
        Self::CorruptData(reason.into())
    }

    /// Create a truncated stream error
    pub fn truncated(declared: u64, available: u64) -> Self {
        Self::TruncatedStream {
            declared,
            available,
        }
    }

    /// Check if this error indicates corrupt or invalid data
    pub fn is_corruption_error(&self) -> bool {
        matches!(
            self,
            Self::CorruptData(_) | Self::DecompressionLimit { .. } | Self::LengthMismatch { .. }
        )
    }

    /// Check if this error indicates missing bytes
    pub fn is_truncation(&self) -> bool {
        matches!(self, Self::TruncatedStream { .. } | Self::EndOfStream)
    }
}

impl From<std::io::Error> for BinViewError {
    fn from(error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::UnexpectedEof {
            return Self::EndOfStream;
        }
        Self::Io(error)
    }
}

impl From<binrw::Error> for BinViewError {
    fn from(error: binrw::Error) -> Self {
        match error {
            binrw::Error::Io(io) => io.into(),
            other => Self::CorruptData(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for BinViewError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}
