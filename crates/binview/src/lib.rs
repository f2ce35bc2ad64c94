//! Cursor-based binary read/write views
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format encoding
#![allow(clippy::cast_possible_wrap)] // Intentional for binary operations
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::doc_markdown)] // Wire terms don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::float_cmp)] // Bit-exact round trips
#![allow(clippy::redundant_closure_for_method_calls)] // Iterator chains
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! This crate reads and writes binary streams through a single cursor that
//! can dive into nested, individually deflate-compressed sections and come
//! back out to exactly where it left off.
//!
//! # Wire Format
//!
//! - **Primitives**: fixed-width, little-endian
//! - **Strings**: metadata byte, 1/4/8-byte unit count, 1- or 2-byte units
//! - **Arrays**: optional 1/2/4/8-byte count, then elements back to back
//! - **Sections**: `[u64 compressed length][raw deflate bytes]`
//! - **Payloads**: `[u64 length][serializer blob]`
//!
//! # Example
//!
//! ```
//! use binview::{BinaryViewReader, BinaryViewWriter};
//!
//! let mut writer = BinaryViewWriter::in_memory();
//! writer.write_u32(7)?;
//! writer.with_section(|w| w.write_string("inside"))?;
//! writer.write_bool(true)?;
//! let bytes = writer.into_bytes()?;
//!
//! let mut reader = BinaryViewReader::from_bytes(bytes);
//! assert_eq!(reader.read_u32()?, 7);
//! assert_eq!(reader.with_section(|r| r.read_string())?, "inside");
//! assert!(reader.read_bool()?);
//! # Ok::<(), binview::BinViewError>(())
//! ```

#![warn(missing_docs)]

pub mod codec;
/// Raw deflate compression with a decompression size guard
pub mod compression;
pub mod config;
pub mod error;
/// Reading side of a binary view
pub mod reader;
pub mod section;
pub mod serializer;
pub mod stream;
/// Writing side of a binary view
pub mod writer;

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
pub(crate) mod test_utils;

pub use codec::{CharWidth, Decimal128, LengthPrefix, StringLayout};
pub use config::CodecConfig;
pub use error::{BinViewError, BinViewResult};
pub use reader::BinaryViewReader;
pub use section::{SectionKind, StackChange, StackEvent, StackObserver};
pub use serializer::{JsonSerializer, PayloadSerializer};
pub use stream::{ByteStream, MemoryStream, ResizableStream, SubRange};
pub use writer::BinaryViewWriter;

use std::io::{Read, Seek, Write};

/// A record layout read and written through binary views
pub trait ViewFormat: Sized {
    /// Write the record at the writer's cursor
    fn write_to<S: Write + Seek, Z: PayloadSerializer>(
        &self,
        writer: &mut BinaryViewWriter<S, Z>,
    ) -> BinViewResult<()>;

    /// Read a record at the reader's cursor
    fn read_from<S: Read + Seek, Z: PayloadSerializer>(
        reader: &mut BinaryViewReader<S, Z>,
    ) -> BinViewResult<Self>;

    /// Encode to a fresh buffer
    fn to_bytes(&self) -> BinViewResult<Vec<u8>> {
        let mut writer = BinaryViewWriter::in_memory();
        self.write_to(&mut writer)?;
        writer.into_bytes()
    }

    /// Decode from the start of `data`
    fn from_bytes(data: &[u8]) -> BinViewResult<Self> {
        let mut reader = BinaryViewReader::from_bytes(data.to_vec());
        Self::read_from(&mut reader)
    }

    /// Verify that decoding and re-encoding `data` reproduces it exactly
    fn verify_round_trip(data: &[u8]) -> BinViewResult<()> {
        let parsed = Self::from_bytes(data)?;
        let rebuilt = parsed.to_bytes()?;
        if data != rebuilt.as_slice() {
            return Err(BinViewError::corrupt(format!(
                "round trip produced {} bytes from {} input bytes",
                rebuilt.len(),
                data.len()
            )));
        }
        Ok(())
    }
}
