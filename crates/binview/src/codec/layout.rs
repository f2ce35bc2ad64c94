//! Length-prefix widths, character widths and the string metadata byte

use crate::error::{BinViewError, BinViewResult};
use serde::{Deserialize, Serialize};

const META_WIDE_LENGTH: u8 = 0b0000_0001;
const META_WIDE_CHARS: u8 = 0b0000_0010;
const META_HUGE_LENGTH: u8 = 0b0000_0100;
const META_RESERVED: u8 = !(META_WIDE_LENGTH | META_WIDE_CHARS | META_HUGE_LENGTH);

/// Width of a length prefix preceding a payload or element sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LengthPrefix {
    /// No prefix; the count travels out of band
    None,
    /// 1-byte unsigned length
    U8,
    /// 2-byte unsigned length
    U16,
    /// 4-byte unsigned length
    U32,
    /// 8-byte unsigned length
    U64,
}

impl LengthPrefix {
    /// Number of bytes the prefix occupies
    pub const fn width(self) -> usize {
        match self {
            Self::None => 0,
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
            Self::U64 => 8,
        }
    }

    /// Largest length the prefix can carry
    pub const fn max_length(self) -> u64 {
        match self {
            Self::None | Self::U64 => u64::MAX,
            Self::U8 => u8::MAX as u64,
            Self::U16 => u16::MAX as u64,
            Self::U32 => u32::MAX as u64,
        }
    }

    /// Whether `length` can be stored in this prefix
    pub const fn fits(self, length: u64) -> bool {
        length <= self.max_length()
    }

    /// Encode `length` into its little-endian prefix bytes
    pub fn encode(self, length: u64) -> BinViewResult<Vec<u8>> {
        if !self.fits(length) {
            return Err(BinViewError::LengthOverflow {
                length,
                prefix: self,
            });
        }
        let bytes = length.to_le_bytes();
        Ok(bytes[..self.width()].to_vec())
    }

    /// Decode a little-endian prefix of exactly [`Self::width`] bytes
    pub fn decode(self, bytes: &[u8]) -> u64 {
        let mut buffer = [0u8; 8];
        let width = self.width().min(bytes.len());
        buffer[..width].copy_from_slice(&bytes[..width]);
        u64::from_le_bytes(buffer)
    }

    /// Smallest string-compatible prefix for a unit count
    fn fitting_string(length: u64) -> Self {
        if Self::U8.fits(length) {
            Self::U8
        } else if Self::U32.fits(length) {
            Self::U32
        } else {
            Self::U64
        }
    }
}

/// Size of one character unit of a string payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharWidth {
    /// One byte per unit; wider units are truncated
    Byte,
    /// Two bytes per unit (UTF-16 code unit)
    Wide,
}

impl CharWidth {
    /// Number of bytes per unit
    pub const fn width(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Wide => 2,
        }
    }
}

/// Length prefix and character width of one encoded string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StringLayout {
    /// Width of the unit-count prefix (`U8`, `U32` or `U64`)
    pub length: LengthPrefix,
    /// Width of each character unit
    pub chars: CharWidth,
}

impl StringLayout {
    /// Explicit layout
    pub const fn new(length: LengthPrefix, chars: CharWidth) -> Self {
        Self { length, chars }
    }

    /// Smallest layout that represents `s` without truncation
    pub fn fitting(s: &str) -> Self {
        let mut units = 0u64;
        let mut wide = false;
        for unit in s.encode_utf16() {
            units += 1;
            wide |= unit > 0xFF;
        }
        Self {
            length: LengthPrefix::fitting_string(units),
            chars: if wide { CharWidth::Wide } else { CharWidth::Byte },
        }
    }

    /// Metadata byte written ahead of the string
    pub fn to_meta(self) -> BinViewResult<u8> {
        let length_bits = match self.length {
            LengthPrefix::U8 => 0,
            LengthPrefix::U32 => META_WIDE_LENGTH,
            LengthPrefix::U64 => META_WIDE_LENGTH | META_HUGE_LENGTH,
            other => return Err(BinViewError::UnsupportedLayout(other)),
        };
        let char_bits = match self.chars {
            CharWidth::Byte => 0,
            CharWidth::Wide => META_WIDE_CHARS,
        };
        Ok(length_bits | char_bits)
    }

    /// Layout described by a metadata byte
    pub fn from_meta(meta: u8) -> BinViewResult<Self> {
        if meta & META_RESERVED != 0 {
            return Err(BinViewError::corrupt(format!(
                "string metadata 0x{meta:02X} has reserved bits set"
            )));
        }
        let length = if meta & META_HUGE_LENGTH != 0 {
            LengthPrefix::U64
        } else if meta & META_WIDE_LENGTH != 0 {
            LengthPrefix::U32
        } else {
            LengthPrefix::U8
        };
        let chars = if meta & META_WIDE_CHARS != 0 {
            CharWidth::Wide
        } else {
            CharWidth::Byte
        };
        Ok(Self { length, chars })
    }
}

impl Default for StringLayout {
    fn default() -> Self {
        Self::new(LengthPrefix::U8, CharWidth::Byte)
    }
}
