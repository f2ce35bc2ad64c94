//! Cursor-based binary reader

use crate::codec::{
    CharWidth, Decimal128, LengthPrefix, SECTION_PREFIX_SIZE, StringLayout, WIRE_ENDIAN,
};
use crate::compression::inflate;
use crate::config::CodecConfig;
use crate::error::{BinViewError, BinViewResult};
use crate::section::{
    ActiveCursor, SectionKind, SectionStack, SectionTag, StackEntry, StackObserver,
};
use crate::serializer::{JsonSerializer, PayloadSerializer};
use crate::stream::{ByteStream, MemoryStream, ResizableStream, SubRange};
use binrw::BinRead;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tracing::debug;

/// Reads primitives, strings, arrays and compressed sections from a stream
///
/// Every read acts on the active cursor: the base stream, or the decompressed
/// buffer of the innermost open section.
#[derive(Debug)]
pub struct BinaryViewReader<S, Z = JsonSerializer> {
    stack: SectionStack<S>,
    serializer: Z,
    config: CodecConfig,
    closed: bool,
}

impl BinaryViewReader<MemoryStream> {
    /// Reader over an owned byte buffer
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::new(MemoryStream::from(bytes))
    }
}

impl BinaryViewReader<BufReader<File>> {
    /// Reader over a file opened read-only
    pub fn open<P: AsRef<Path>>(path: P) -> BinViewResult<Self> {
        let file = File::open(path.as_ref())?;
        debug!("opened {} for reading", path.as_ref().display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<S: Read + Seek> BinaryViewReader<S> {
    /// Reader with the default configuration
    ///
    /// Pass `&mut stream` to keep ownership of the stream with the caller.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, CodecConfig::default())
    }

    /// Reader with an explicit configuration
    pub fn with_config(stream: S, config: CodecConfig) -> Self {
        Self::with_serializer(stream, config, JsonSerializer::new())
    }
}

impl<S: Read + Seek, Z: PayloadSerializer> BinaryViewReader<S, Z> {
    /// Reader with an explicit configuration and payload serializer
    pub fn with_serializer(stream: S, config: CodecConfig, serializer: Z) -> Self {
        Self {
            stack: SectionStack::new(stream),
            serializer,
            config,
            closed: false,
        }
    }

    fn cursor(&mut self) -> BinViewResult<ActiveCursor<'_, S>> {
        if self.closed {
            return Err(BinViewError::Closed);
        }
        Ok(self.stack.top_mut())
    }

    fn ensure_available(&mut self, needed: u64) -> BinViewResult<()> {
        let available = self.cursor()?.remaining()?;
        if needed > available {
            return Err(BinViewError::truncated(needed, available));
        }
        Ok(())
    }

    fn read_le<T>(&mut self) -> BinViewResult<T>
    where
        T: BinRead,
        for<'a> T::Args<'a>: Default,
    {
        let mut cursor = self.cursor()?;
        Ok(T::read_options(&mut cursor, WIRE_ENDIAN, Default::default())?)
    }

    /// Position of the active cursor
    pub fn position(&mut self) -> BinViewResult<u64> {
        Ok(self.cursor()?.position()?)
    }

    /// Move the active cursor
    pub fn set_position(&mut self, position: u64) -> BinViewResult<()> {
        Ok(self.cursor()?.set_position(position)?)
    }

    /// Length of the active cursor's stream
    pub fn length(&mut self) -> BinViewResult<u64> {
        Ok(self.cursor()?.length()?)
    }

    /// Bytes left in the active cursor's stream
    pub fn remaining(&mut self) -> BinViewResult<u64> {
        Ok(self.cursor()?.remaining()?)
    }

    /// Section stack depth, base included
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Configuration in use
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Register an observer for section enter/leave events
    pub fn subscribe(&mut self, observer: StackObserver) {
        self.stack.subscribe(observer);
    }

    /// Read a boolean (one byte, non-zero is `true`)
    pub fn read_bool(&mut self) -> BinViewResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Read an unsigned byte
    pub fn read_u8(&mut self) -> BinViewResult<u8> {
        self.read_le()
    }

    /// Read a signed byte
    pub fn read_i8(&mut self) -> BinViewResult<i8> {
        self.read_le()
    }

    /// Read a `u16`
    pub fn read_u16(&mut self) -> BinViewResult<u16> {
        self.read_le()
    }

    /// Read an `i16`
    pub fn read_i16(&mut self) -> BinViewResult<i16> {
        self.read_le()
    }

    /// Read a `u32`
    pub fn read_u32(&mut self) -> BinViewResult<u32> {
        self.read_le()
    }

    /// Read an `i32`
    pub fn read_i32(&mut self) -> BinViewResult<i32> {
        self.read_le()
    }

    /// Read a `u64`
    pub fn read_u64(&mut self) -> BinViewResult<u64> {
        self.read_le()
    }

    /// Read an `i64`
    pub fn read_i64(&mut self) -> BinViewResult<i64> {
        self.read_le()
    }

    /// Read an `f32`
    pub fn read_f32(&mut self) -> BinViewResult<f32> {
        self.read_le()
    }

    /// Read an `f64`
    pub fn read_f64(&mut self) -> BinViewResult<f64> {
        self.read_le()
    }

    /// Read a character stored as one 16-bit unit
    pub fn read_char(&mut self) -> BinViewResult<char> {
        let unit = self.read_u16()?;
        char::from_u32(u32::from(unit)).ok_or_else(|| {
            BinViewError::corrupt(format!("lone surrogate 0x{unit:04X} is not a character"))
        })
    }

    /// Read a 16-byte fixed-point decimal
    pub fn read_decimal(&mut self) -> BinViewResult<Decimal128> {
        self.read_value()
    }

    /// Read a fixed-layout value described by its `BinRead` implementation
    pub fn read_value<T>(&mut self) -> BinViewResult<T>
    where
        T: BinRead,
        for<'a> T::Args<'a>: Default,
    {
        self.read_le()
    }

    /// Read exactly `count` raw bytes
    pub fn read_bytes(&mut self, count: usize) -> BinViewResult<Vec<u8>> {
        self.ensure_available(count as u64)?;
        let mut bytes = vec![0u8; count];
        self.cursor()?.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    /// Fill `buf` as far as the stream allows, returning the bytes read
    ///
    /// A short or zero count means the end of the active stream was reached.
    pub fn read_into(&mut self, buf: &mut [u8]) -> BinViewResult<usize> {
        let mut cursor = self.cursor()?;
        let mut total = 0;
        while total < buf.len() {
            let read = cursor.read(&mut buf[total..])?;
            if read == 0 {
                break;
            }
            total += read;
        }
        Ok(total)
    }

    /// Read a length prefix; `None` for [`LengthPrefix::None`]
    pub fn read_length(&mut self, prefix: LengthPrefix) -> BinViewResult<Option<u64>> {
        if prefix == LengthPrefix::None {
            return Ok(None);
        }
        let mut bytes = [0u8; 8];
        let width = prefix.width();
        self.cursor()?.read_exact(&mut bytes[..width])?;
        Ok(Some(prefix.decode(&bytes[..width])))
    }

    fn element_count(
        &mut self,
        prefix: LengthPrefix,
        expected: Option<usize>,
    ) -> BinViewResult<usize> {
        match (self.read_length(prefix)?, expected) {
            (Some(declared), Some(expected)) if declared != expected as u64 => {
                Err(BinViewError::LengthMismatch {
                    expected: expected as u64,
                    declared,
                })
            }
            (Some(declared), _) => usize::try_from(declared).map_err(|_| {
                BinViewError::corrupt(format!("element count {declared} exceeds address space"))
            }),
            (None, Some(expected)) => Ok(expected),
            (None, None) => Err(BinViewError::MissingElementCount),
        }
    }

    /// Read a string written with its metadata byte
    ///
    /// Wide strings holding an unpaired surrogate fail with
    /// [`BinViewError::CorruptData`].
    pub fn read_string(&mut self) -> BinViewResult<String> {
        let meta = self.read_u8()?;
        let layout = StringLayout::from_meta(meta)?;
        let units = self.read_length(layout.length)?.unwrap_or(0);
        let size = units
            .checked_mul(layout.chars.width() as u64)
            .ok_or_else(|| BinViewError::corrupt(format!("string of {units} units overflows")))?;
        let size = usize::try_from(size)
            .map_err(|_| BinViewError::corrupt(format!("string of {size} bytes overflows")))?;
        let bytes = self.read_bytes(size)?;

        let text = match layout.chars {
            CharWidth::Byte => bytes.iter().copied().map(char::from).collect(),
            CharWidth::Wide => {
                let units = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
                char::decode_utf16(units)
                    .collect::<Result<String, _>>()
                    .map_err(|error| {
                        BinViewError::corrupt(format!(
                            "unpaired surrogate {:#06x} in wide string",
                            error.unpaired_surrogate()
                        ))
                    })?
            }
        };
        Ok(text)
    }

    /// Read a sequence of strings prefixed with the configured array prefix
    pub fn read_string_array(&mut self) -> BinViewResult<Vec<String>> {
        let prefix = self.config.array_prefix;
        self.read_list(prefix, None, Self::read_string)
    }

    /// Read fixed-layout values prefixed with the configured array prefix
    pub fn read_array<T>(&mut self) -> BinViewResult<Vec<T>>
    where
        T: BinRead,
        for<'a> T::Args<'a>: Default,
    {
        let prefix = self.config.array_prefix;
        self.read_array_with(prefix, None)
    }

    /// Read fixed-layout values with an explicit prefix
    ///
    /// With [`LengthPrefix::None`] the count must be supplied in `expected`;
    /// with a prefix, a supplied count must match the stored one.
    pub fn read_array_with<T>(
        &mut self,
        prefix: LengthPrefix,
        expected: Option<usize>,
    ) -> BinViewResult<Vec<T>>
    where
        T: BinRead,
        for<'a> T::Args<'a>: Default,
    {
        self.read_list(prefix, expected, Self::read_value::<T>)
    }

    /// Read a sequence whose elements are decoded by `element`
    pub fn read_list<T, F>(
        &mut self,
        prefix: LengthPrefix,
        expected: Option<usize>,
        mut element: F,
    ) -> BinViewResult<Vec<T>>
    where
        F: FnMut(&mut Self) -> BinViewResult<T>,
    {
        let count = self.element_count(prefix, expected)?;
        // Every element occupies at least one byte
        self.ensure_available(count as u64)?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(element(self)?);
        }
        Ok(items)
    }

    /// Append a sequence of fixed-layout values to `list`, returning the count
    pub fn read_into_list<T>(
        &mut self,
        list: &mut Vec<T>,
        prefix: LengthPrefix,
        expected: Option<usize>,
    ) -> BinViewResult<usize>
    where
        T: BinRead,
        for<'a> T::Args<'a>: Default,
    {
        let items = self.read_array_with(prefix, expected)?;
        let count = items.len();
        list.extend(items);
        Ok(count)
    }

    /// Read one opaque payload through the injected serializer
    pub fn deserialize<T: DeserializeOwned>(&mut self) -> BinViewResult<T> {
        let length = self.read_u64()?;
        let length = usize::try_from(length)
            .map_err(|_| BinViewError::corrupt(format!("payload of {length} bytes overflows")))?;
        let blob = self.read_bytes(length)?;
        self.serializer.decode(&blob)
    }

    /// Enter a deflate section
    ///
    /// Reads the 8-byte compressed length, inflates exactly that many bytes
    /// and makes the inflated buffer the active cursor. The parent cursor is
    /// left just past the compressed payload.
    pub fn begin_section(&mut self) -> BinViewResult<()> {
        let declared = self.read_u64()?;
        let limit = self.config.max_section_size;
        let (start, payload) = {
            let mut cursor = self.cursor()?;
            let start = cursor.position()?;
            let available = cursor.length()?.saturating_sub(start);
            if declared > available {
                return Err(BinViewError::truncated(declared, available));
            }
            let payload = {
                let mut range = SubRange::new(&mut cursor, start, declared)?;
                inflate(&mut range, limit)?
            };
            cursor.set_position(start + declared)?;
            (start, payload)
        };

        debug!(
            offset = start,
            compressed = declared,
            inflated = payload.len(),
            depth = self.stack.depth() + 1,
            "entering deflate section"
        );
        let tag = SectionTag::new(SectionKind::Deflate, start - SECTION_PREFIX_SIZE);
        self.stack
            .push(StackEntry::new(MemoryStream::from(payload), true, Some(tag)));
        Ok(())
    }

    /// Leave the innermost deflate section and release its buffer
    pub fn end_section(&mut self) -> BinViewResult<()> {
        if self.closed {
            return Err(BinViewError::Closed);
        }
        let tag = self.stack.expect_top(SectionKind::Deflate)?;
        self.stack.dispose_top()?;
        debug!(
            origin = tag.origin,
            depth = self.stack.depth(),
            "left deflate section"
        );
        Ok(())
    }

    /// Run `body` inside a deflate section, leaving it on every exit path
    ///
    /// When `body` fails, every section it left open is released along with
    /// this one, so the parent cursor resumes just past the section.
    pub fn with_section<T, F>(&mut self, body: F) -> BinViewResult<T>
    where
        F: FnOnce(&mut Self) -> BinViewResult<T>,
    {
        let depth = self.stack.depth();
        self.begin_section()?;
        match body(self) {
            Ok(value) => {
                self.end_section()?;
                Ok(value)
            }
            Err(error) => {
                let released = self.stack.unwind_to(depth);
                debug!(released, depth, "released sections after failed body");
                Err(error)
            }
        }
    }

    /// Inflate everything from the current position to the end of the base
    /// stream and continue reading from the inflated data
    ///
    /// Must be called before any section is entered.
    pub fn decompress_all(&mut self) -> BinViewResult<()> {
        if !self.stack.is_base() {
            return Err(BinViewError::InvalidState(
                "whole-stream decompression inside an open section".to_string(),
            ));
        }
        let limit = self.config.max_section_size;
        let (origin, payload) = {
            let mut cursor = self.cursor()?;
            let origin = cursor.position()?;
            (origin, inflate(&mut cursor, limit)?)
        };
        debug!(
            offset = origin,
            inflated = payload.len(),
            "decompressed whole stream"
        );
        let tag = SectionTag::new(SectionKind::WholeStream, origin);
        self.stack
            .push(StackEntry::new(MemoryStream::from(payload), true, Some(tag)));
        Ok(())
    }

    /// Release every section buffer, innermost first
    ///
    /// Idempotent; later reads fail with [`BinViewError::Closed`].
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        let released = self.stack.unwind();
        if released > 0 {
            debug!(released, "released open sections on close");
        }
        self.closed = true;
    }

    /// Close the reader and return the base stream
    pub fn into_inner(mut self) -> S {
        self.close();
        self.stack.into_base()
    }
}

impl<S: Read + ResizableStream, Z: PayloadSerializer> BinaryViewReader<S, Z> {
    /// Truncate or zero-extend the active cursor's stream
    ///
    /// Inside a section only the inflated buffer changes.
    pub fn set_length(&mut self, length: u64) -> BinViewResult<()> {
        Ok(self.cursor()?.set_length(length)?)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::compression::deflate;
    use pretty_assertions::assert_eq;

    fn section_bytes(payload: &[u8]) -> Vec<u8> {
        let compressed = deflate(payload, 6).expect("Operation should succeed");
        let mut bytes = (compressed.len() as u64).to_le_bytes().to_vec();
        bytes.extend_from_slice(&compressed);
        bytes
    }

    #[test]
    fn test_read_ab_string() {
        let mut reader = BinaryViewReader::from_bytes(vec![0b00, 2, b'a', b'b']);
        assert_eq!(reader.read_string().expect("Operation should succeed"), "ab");
        assert_eq!(reader.remaining().expect("Operation should succeed"), 0);
    }

    #[test]
    fn test_read_wide_string() {
        // meta: 4-byte length, 2-byte units
        let mut bytes = vec![0b11];
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&0x25CBu16.to_le_bytes());
        bytes.extend_from_slice(&u16::from(b'x').to_le_bytes());
        let mut reader = BinaryViewReader::from_bytes(bytes);
        assert_eq!(reader.read_string().expect("Operation should succeed"), "○x");
    }

    #[test]
    fn test_string_length_past_end() {
        let mut reader = BinaryViewReader::from_bytes(vec![0, 10, b'a']);
        assert!(matches!(
            reader.read_string(),
            Err(BinViewError::TruncatedStream {
                declared: 10,
                available: 1
            })
        ));
    }

    #[test]
    fn test_primitive_past_end() {
        let mut reader = BinaryViewReader::from_bytes(vec![1, 2]);
        assert!(matches!(reader.read_u32(), Err(BinViewError::EndOfStream)));
    }

    #[test]
    fn test_read_into_short_read() {
        let mut reader = BinaryViewReader::from_bytes(vec![1, 2, 3]);
        let mut buffer = [0u8; 8];
        assert_eq!(reader.read_into(&mut buffer).expect("Operation should succeed"), 3);
        assert_eq!(reader.read_into(&mut buffer).expect("Operation should succeed"), 0);
    }

    #[test]
    fn test_surrogate_char_rejected() {
        let mut reader = BinaryViewReader::from_bytes(0xD800u16.to_le_bytes().to_vec());
        assert!(matches!(reader.read_char(), Err(BinViewError::CorruptData(_))));
    }

    #[test]
    fn test_section_leaves_parent_after_payload() {
        let mut bytes = section_bytes(b"inner");
        bytes.push(0x7F);
        let mut reader = BinaryViewReader::from_bytes(bytes);

        reader.begin_section().expect("Operation should succeed");
        assert_eq!(reader.depth(), 2);
        assert_eq!(reader.read_bytes(5).expect("Operation should succeed"), b"inner");
        reader.end_section().expect("Operation should succeed");

        assert_eq!(reader.read_u8().expect("Operation should succeed"), 0x7F);
    }

    #[test]
    fn test_section_length_past_end() {
        let mut bytes = 1000u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 10]);
        let mut reader = BinaryViewReader::from_bytes(bytes);
        assert!(matches!(
            reader.begin_section(),
            Err(BinViewError::TruncatedStream {
                declared: 1000,
                available: 10
            })
        ));
        assert_eq!(reader.depth(), 1);
    }

    #[test]
    fn test_corrupt_section() {
        let mut bytes = 4u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0xFF; 4]);
        let mut reader = BinaryViewReader::from_bytes(bytes);
        assert!(matches!(
            reader.begin_section(),
            Err(BinViewError::CorruptData(_))
        ));
    }

    #[test]
    fn test_end_section_without_begin() {
        let mut reader = BinaryViewReader::from_bytes(Vec::new());
        assert!(matches!(reader.end_section(), Err(BinViewError::Underflow)));
    }

    #[test]
    fn test_section_limit() {
        let bytes = section_bytes(&[0u8; 64 * 1024]);
        let config = CodecConfig::default().with_max_section_size(1024);
        let mut reader = BinaryViewReader::with_config(MemoryStream::from(bytes), config);
        assert!(matches!(
            reader.begin_section(),
            Err(BinViewError::DecompressionLimit { limit: 1024 })
        ));
    }

    #[test]
    fn test_array_requires_count_without_prefix() {
        let mut reader = BinaryViewReader::from_bytes(vec![1, 2, 3]);
        let result = reader.read_array_with::<u8>(LengthPrefix::None, None);
        assert!(matches!(result, Err(BinViewError::MissingElementCount)));

        let values = reader
            .read_array_with::<u8>(LengthPrefix::None, Some(3))
            .expect("Operation should succeed");
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_array_count_mismatch() {
        let mut reader = BinaryViewReader::from_bytes(vec![2, 9, 9]);
        let result = reader.read_array_with::<u8>(LengthPrefix::U8, Some(3));
        assert!(matches!(
            result,
            Err(BinViewError::LengthMismatch {
                expected: 3,
                declared: 2
            })
        ));
    }

    #[test]
    fn test_array_count_past_end() {
        let mut bytes = 1_000_000u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        let mut reader = BinaryViewReader::from_bytes(bytes);
        assert!(matches!(
            reader.read_array::<u32>(),
            Err(BinViewError::TruncatedStream { .. })
        ));
    }

    #[test]
    fn test_borrowed_stream_survives_reader() {
        let mut stream = MemoryStream::from(vec![5, 6]);
        {
            let mut reader = BinaryViewReader::new(&mut stream);
            assert_eq!(reader.read_u8().expect("Operation should succeed"), 5);
            reader.close();
        }
        let mut byte = [0u8; 1];
        stream.read_exact(&mut byte).expect("Operation should succeed");
        assert_eq!(byte[0], 6);
    }

    #[test]
    fn test_with_section_unwinds_nested_sections_on_error() {
        let mut bytes = section_bytes(&section_bytes(&[1, 2]));
        bytes.push(0x42);

        let mut reader = BinaryViewReader::from_bytes(bytes);
        let result = reader.with_section(|r| {
            r.begin_section()?;
            r.read_u32()
        });
        assert!(matches!(result, Err(BinViewError::EndOfStream)));
        assert_eq!(reader.depth(), 1);
        assert_eq!(reader.read_u8().expect("Operation should succeed"), 0x42);
    }

    #[test]
    fn test_read_length_widths() {
        let mut bytes = vec![0x7F];
        bytes.extend_from_slice(&0x1234u16.to_le_bytes());
        bytes.extend_from_slice(&0x0102_0304u32.to_le_bytes());
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend_from_slice(&[1, 2]);
        let mut reader = BinaryViewReader::from_bytes(bytes);

        let read = |r: &mut BinaryViewReader<MemoryStream>, prefix| {
            r.read_length(prefix).expect("Operation should succeed")
        };
        assert_eq!(read(&mut reader, LengthPrefix::None), None);
        assert_eq!(read(&mut reader, LengthPrefix::U8), Some(0x7F));
        assert_eq!(read(&mut reader, LengthPrefix::U16), Some(0x1234));
        assert_eq!(read(&mut reader, LengthPrefix::U32), Some(0x0102_0304));
        assert_eq!(read(&mut reader, LengthPrefix::U64), Some(u64::MAX));
        assert!(matches!(
            reader.read_length(LengthPrefix::U32),
            Err(BinViewError::EndOfStream)
        ));
    }

    #[test]
    fn test_wide_string_with_unpaired_surrogate_is_corrupt() {
        let mut bytes = vec![0b10, 2];
        bytes.extend_from_slice(&0x0041u16.to_le_bytes());
        bytes.extend_from_slice(&0xD800u16.to_le_bytes());
        let mut reader = BinaryViewReader::from_bytes(bytes);
        let error = reader.read_string().expect_err("lone surrogate must not decode");
        assert!(error.is_corruption_error());
    }

    #[test]
    fn test_wide_string_with_surrogate_pair() {
        let mut bytes = vec![0b10, 2];
        for unit in "\u{1F600}".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let mut reader = BinaryViewReader::from_bytes(bytes);
        assert_eq!(
            reader.read_string().expect("Operation should succeed"),
            "\u{1F600}"
        );
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut reader = BinaryViewReader::from_bytes(section_bytes(b"x"));
        reader.begin_section().expect("Operation should succeed");
        reader.close();
        reader.close();
        assert_eq!(reader.depth(), 1);
        assert!(matches!(reader.read_u8(), Err(BinViewError::Closed)));
    }

    #[test]
    fn test_set_length_truncates_base() {
        let mut reader = BinaryViewReader::from_bytes(vec![1, 2, 3, 4, 5]);
        reader.set_length(2).expect("Operation should succeed");
        assert_eq!(reader.length().expect("Operation should succeed"), 2);
        assert_eq!(reader.read_u8().expect("Operation should succeed"), 1);
        assert_eq!(reader.read_u8().expect("Operation should succeed"), 2);
        assert!(matches!(reader.read_u8(), Err(BinViewError::EndOfStream)));
    }

    #[test]
    fn test_set_length_inside_section() {
        let mut bytes = section_bytes(&[1, 2, 3, 4]);
        bytes.push(9);
        let mut reader = BinaryViewReader::from_bytes(bytes);
        reader.begin_section().expect("Operation should succeed");
        reader.set_length(1).expect("Operation should succeed");
        assert_eq!(reader.read_u8().expect("Operation should succeed"), 1);
        assert!(matches!(reader.read_u8(), Err(BinViewError::EndOfStream)));
        reader.end_section().expect("Operation should succeed");
        assert_eq!(reader.read_u8().expect("Operation should succeed"), 9);
    }

    #[test]
    fn test_set_length_on_read_only_file_fails() {
        let dir = tempfile::tempdir().expect("Operation should succeed");
        let path = dir.path().join("input.bin");
        std::fs::write(&path, [1, 2, 3, 4]).expect("Operation should succeed");
        let mut reader = BinaryViewReader::open(&path).expect("Operation should succeed");
        assert!(reader.set_length(1).is_err());
        assert_eq!(std::fs::read(&path).expect("Operation should succeed").len(), 4);
    }
}
