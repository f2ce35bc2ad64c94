//! Wire layout vocabulary shared by the reader and writer
//!
//! All multi-byte fields are little-endian, regardless of the host.
//!
//! # String layout
//!
//! ```text
//! [meta: u8][length: 1 | 4 | 8 bytes][units: length x (1 | 2) bytes]
//! ```
//!
//! Bit 0 of `meta` selects a 4-byte length (clear: 1 byte), bit 2 selects an
//! 8-byte length and takes precedence over bit 0, bit 1 selects 2-byte
//! character units (clear: 1 byte). Remaining bits are reserved and must be
//! zero.

mod decimal;
mod layout;

pub use decimal::Decimal128;
pub use layout::{CharWidth, LengthPrefix, StringLayout};

use binrw::Endian;

/// Byte order of every multi-byte field on the wire
pub const WIRE_ENDIAN: Endian = Endian::Little;

/// Size of the compressed-section length prefix
pub const SECTION_PREFIX_SIZE: u64 = 8;
