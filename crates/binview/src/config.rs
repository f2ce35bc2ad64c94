//! Configuration for binary views

use crate::codec::LengthPrefix;
use crate::compression::MAX_DECOMPRESSION_SIZE;
use serde::{Deserialize, Serialize};

/// Configuration shared by readers and writers
///
/// Writer and reader must agree on `array_prefix`; it is not recorded in the
/// stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Deflate level (0-9) used for sections and whole-stream compression
    pub compression_level: u32,

    /// Maximum inflated size of one section or compressed stream (in bytes)
    pub max_section_size: usize,

    /// Prefix width used by the array, list and string-array helpers
    pub array_prefix: LengthPrefix,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            compression_level: 6,
            max_section_size: MAX_DECOMPRESSION_SIZE,
            array_prefix: LengthPrefix::U32,
        }
    }
}

impl CodecConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the deflate level, clamped to 9
    #[must_use]
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    /// Set the maximum inflated section size
    #[must_use]
    pub const fn with_max_section_size(mut self, size: usize) -> Self {
        self.max_section_size = size;
        self
    }

    /// Set the prefix width for array helpers
    #[must_use]
    pub const fn with_array_prefix(mut self, prefix: LengthPrefix) -> Self {
        self.array_prefix = prefix;
        self
    }
}
