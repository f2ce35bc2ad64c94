//! Cursor-based binary writer

use crate::codec::{CharWidth, Decimal128, LengthPrefix, StringLayout, WIRE_ENDIAN};
use crate::compression::deflate;
use crate::config::CodecConfig;
use crate::error::{BinViewError, BinViewResult};
use crate::section::{ActiveCursor, SectionKind, SectionStack, SectionTag, StackObserver};
use crate::serializer::{JsonSerializer, PayloadSerializer};
use crate::stream::{ByteStream, MemoryStream, ResizableStream, SubRange};
use binrw::BinWrite;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use tracing::{debug, trace, warn};

/// Writes primitives, strings, arrays and compressed sections to a stream
///
/// Inside a section every write lands in the section's buffer; the buffer is
/// compressed and appended to the parent as `[u64 length][deflate bytes]`
/// when the section ends.
pub struct BinaryViewWriter<S: Write + Seek, Z = JsonSerializer> {
    stack: Option<SectionStack<S>>,
    serializer: Z,
    config: CodecConfig,
    closed: bool,
}

impl BinaryViewWriter<MemoryStream> {
    /// Writer over a fresh in-memory buffer
    pub fn in_memory() -> Self {
        Self::new(MemoryStream::new())
    }
}

impl BinaryViewWriter<BufWriter<File>> {
    /// Writer over a newly created (or truncated) file
    pub fn create<P: AsRef<Path>>(path: P) -> BinViewResult<Self> {
        let file = File::create(path.as_ref())?;
        debug!("created {} for writing", path.as_ref().display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<S: Write + Seek> BinaryViewWriter<S> {
    /// Writer with the default configuration
    ///
    /// Pass `&mut stream` to keep ownership of the stream with the caller.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, CodecConfig::default())
    }

    /// Writer with an explicit configuration
    pub fn with_config(stream: S, config: CodecConfig) -> Self {
        Self::with_serializer(stream, config, JsonSerializer::new())
    }
}

impl<S: Write + Seek, Z> BinaryViewWriter<S, Z> {
    fn stack(&mut self) -> BinViewResult<&mut SectionStack<S>> {
        if self.closed {
            return Err(BinViewError::Closed);
        }
        self.stack.as_mut().ok_or(BinViewError::Closed)
    }

    /// Finish whole-stream compression if it is the top entry
    fn finish_whole_stream(stack: &mut SectionStack<S>, level: u32) -> BinViewResult<()> {
        if stack.expect_top(SectionKind::WholeStream).is_err() {
            return Ok(());
        }
        let entry = stack.pop()?;
        let payload = entry.into_stream().into_inner();
        let compressed = deflate(&payload, level)?;
        stack.top_mut().write_all(&compressed)?;
        debug!(
            raw = payload.len(),
            compressed = compressed.len(),
            "compressed whole stream"
        );
        Ok(())
    }

    /// Flush and release everything
    ///
    /// Deflate sections still open are abandoned innermost first and their
    /// content is discarded; whole-stream compression is completed. Calling
    /// `close` again does nothing, and later writes fail with
    /// [`BinViewError::Closed`].
    pub fn close(&mut self) -> BinViewResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let level = self.config.compression_level;
        let Some(stack) = self.stack.as_mut() else {
            return Ok(());
        };

        while let Some(tag) = stack.top_tag().copied() {
            if tag.kind == SectionKind::WholeStream {
                break;
            }
            warn!(
                kind = %tag.kind,
                origin = tag.origin,
                "abandoning open section on close"
            );
            stack.dispose_top()?;
        }
        Self::finish_whole_stream(stack, level)?;
        stack.base_mut().flush()?;
        Ok(())
    }

    /// Close the writer and return the base stream
    pub fn into_inner(mut self) -> BinViewResult<S> {
        self.close()?;
        let stack = self.stack.take().ok_or(BinViewError::Closed)?;
        Ok(stack.into_base())
    }
}

impl<Z> BinaryViewWriter<MemoryStream, Z> {
    /// Close the writer and return the written bytes
    pub fn into_bytes(self) -> BinViewResult<Vec<u8>> {
        Ok(self.into_inner()?.into_inner())
    }
}

impl<S: Write + Seek, Z: PayloadSerializer> BinaryViewWriter<S, Z> {
    /// Writer with an explicit configuration and payload serializer
    pub fn with_serializer(stream: S, config: CodecConfig, serializer: Z) -> Self {
        Self {
            stack: Some(SectionStack::new(stream)),
            serializer,
            config,
            closed: false,
        }
    }

    fn cursor(&mut self) -> BinViewResult<ActiveCursor<'_, S>> {
        Ok(self.stack()?.top_mut())
    }

    fn write_le<T>(&mut self, value: &T) -> BinViewResult<()>
    where
        T: BinWrite,
        for<'a> T::Args<'a>: Default,
    {
        let mut cursor = self.cursor()?;
        value.write_options(&mut cursor, WIRE_ENDIAN, Default::default())?;
        Ok(())
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

    /// Section stack depth, base included
    pub fn depth(&self) -> usize {
        self.stack.as_ref().map_or(0, SectionStack::depth)
    }

    /// Configuration in use
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Register an observer for section enter/leave events
    pub fn subscribe(&mut self, observer: StackObserver) -> BinViewResult<()> {
        self.stack()?.subscribe(observer);
        Ok(())
    }

    /// Write a boolean as one byte
    pub fn write_bool(&mut self, value: bool) -> BinViewResult<()> {
        self.write_u8(u8::from(value))
    }

    /// Write an unsigned byte
    pub fn write_u8(&mut self, value: u8) -> BinViewResult<()> {
        self.write_le(&value)
    }

    /// Write a signed byte
    pub fn write_i8(&mut self, value: i8) -> BinViewResult<()> {
        self.write_le(&value)
    }

    /// Write a `u16`
    pub fn write_u16(&mut self, value: u16) -> BinViewResult<()> {
        self.write_le(&value)
    }

    /// Write an `i16`
    pub fn write_i16(&mut self, value: i16) -> BinViewResult<()> {
        self.write_le(&value)
    }

    /// Write a `u32`
    pub fn write_u32(&mut self, value: u32) -> BinViewResult<()> {
        self.write_le(&value)
    }

    /// Write an `i32`
    pub fn write_i32(&mut self, value: i32) -> BinViewResult<()> {
        self.write_le(&value)
    }

    /// Write a `u64`
    pub fn write_u64(&mut self, value: u64) -> BinViewResult<()> {
        self.write_le(&value)
    }

    /// Write an `i64`
    pub fn write_i64(&mut self, value: i64) -> BinViewResult<()> {
        self.write_le(&value)
    }

    /// Write an `f32`
    pub fn write_f32(&mut self, value: f32) -> BinViewResult<()> {
        self.write_le(&value)
    }

    /// Write an `f64`
    pub fn write_f64(&mut self, value: f64) -> BinViewResult<()> {
        self.write_le(&value)
    }

    /// Write a character as one 16-bit unit
    ///
    /// Characters outside the Basic Multilingual Plane are rejected.
    pub fn write_char(&mut self, value: char) -> BinViewResult<()> {
        let code = u32::from(value);
        let unit = u16::try_from(code).map_err(|_| BinViewError::CharOutOfRange { code })?;
        self.write_u16(unit)
    }

    /// Write a 16-byte fixed-point decimal
    pub fn write_decimal(&mut self, value: &Decimal128) -> BinViewResult<()> {
        self.write_value(value)
    }

    /// Write a fixed-layout value described by its `BinWrite` implementation
    pub fn write_value<T>(&mut self, value: &T) -> BinViewResult<()>
    where
        T: BinWrite,
        for<'a> T::Args<'a>: Default,
    {
        self.write_le(value)
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> BinViewResult<()> {
        self.cursor()?.write_all(bytes)?;
        Ok(())
    }

    /// Write a length prefix; nothing for [`LengthPrefix::None`]
    pub fn write_length(&mut self, prefix: LengthPrefix, length: u64) -> BinViewResult<()> {
        let bytes = prefix.encode(length)?;
        self.write_bytes(&bytes)
    }

    /// Write a string with the smallest layout that holds it
    pub fn write_string(&mut self, value: &str) -> BinViewResult<()> {
        self.write_string_with(value, StringLayout::fitting(value))
    }

    /// Write a string with an explicit layout
    ///
    /// With [`CharWidth::Byte`] every UTF-16 unit above `0xFF` is truncated
    /// to its low byte.
    pub fn write_string_with(&mut self, value: &str, layout: StringLayout) -> BinViewResult<()> {
        let meta = layout.to_meta()?;
        let units: Vec<u16> = value.encode_utf16().collect();
        let prefix = layout.length.encode(units.len() as u64)?;

        let mut encoded =
            Vec::with_capacity(1 + prefix.len() + units.len() * layout.chars.width());
        encoded.push(meta);
        encoded.extend_from_slice(&prefix);
        match layout.chars {
            CharWidth::Byte => encoded.extend(units.iter().map(|&unit| unit as u8)),
            CharWidth::Wide => {
                for unit in &units {
                    encoded.extend_from_slice(&unit.to_le_bytes());
                }
            }
        }
        self.write_bytes(&encoded)
    }

    /// Write strings behind the configured array prefix
    pub fn write_string_array<T: AsRef<str>>(&mut self, values: &[T]) -> BinViewResult<()> {
        let prefix = self.config.array_prefix;
        self.write_list(values, prefix, |writer, value| {
            writer.write_string(value.as_ref())
        })
    }

    /// Write fixed-layout values behind the configured array prefix
    pub fn write_array<T>(&mut self, values: &[T]) -> BinViewResult<()>
    where
        T: BinWrite,
        for<'a> T::Args<'a>: Default,
    {
        let prefix = self.config.array_prefix;
        self.write_array_with(values, prefix)
    }

    /// Write fixed-layout values with an explicit prefix
    ///
    /// Fails with [`BinViewError::LengthOverflow`] before writing anything
    /// when the count does not fit the prefix.
    pub fn write_array_with<T>(&mut self, values: &[T], prefix: LengthPrefix) -> BinViewResult<()>
    where
        T: BinWrite,
        for<'a> T::Args<'a>: Default,
    {
        self.write_list(values, prefix, |writer, value| writer.write_value(value))
    }

    /// Write a sequence whose elements are encoded by `element`
    pub fn write_list<T, F>(
        &mut self,
        values: &[T],
        prefix: LengthPrefix,
        mut element: F,
    ) -> BinViewResult<()>
    where
        F: FnMut(&mut Self, &T) -> BinViewResult<()>,
    {
        self.write_length(prefix, values.len() as u64)?;
        for value in values {
            element(self, value)?;
        }
        Ok(())
    }

    /// Write one opaque payload through the injected serializer
    pub fn serialize<T: Serialize + ?Sized>(&mut self, value: &T) -> BinViewResult<()> {
        let blob = self.serializer.encode(value)?;
        self.write_u64(blob.len() as u64)?;
        self.write_bytes(&blob)
    }

    /// Enter a deflate section; writes are buffered until [`Self::end_section`]
    pub fn begin_section(&mut self) -> BinViewResult<()> {
        let stack = self.stack()?;
        let origin = stack.top_mut().position()?;
        stack.push_buffer(SectionTag::new(SectionKind::Deflate, origin));
        debug!(origin, depth = stack.depth(), "entering deflate section");
        Ok(())
    }

    /// Leave the innermost deflate section
    ///
    /// The buffered bytes are compressed and appended to the parent cursor at
    /// its current position as `[u64 length][deflate bytes]`.
    pub fn end_section(&mut self) -> BinViewResult<()> {
        let level = self.config.compression_level;
        let stack = self.stack()?;
        stack.expect_top(SectionKind::Deflate)?;
        let entry = stack.pop()?;
        let origin = entry.tag().map_or(0, |tag| tag.origin);
        let payload = entry.into_stream().into_inner();
        let compressed = deflate(&payload, level)?;

        let mut parent = stack.top_mut();
        let frame_offset = parent.position()?;
        let framed = {
            let mut frame = SubRange::growable(&mut parent, frame_offset)?;
            frame.write_all(&(compressed.len() as u64).to_le_bytes())?;
            frame.write_all(&compressed)?;
            frame.len()
        };
        debug!(
            origin,
            framed,
            raw = payload.len(),
            compressed = compressed.len(),
            depth = stack.depth(),
            "left deflate section"
        );
        Ok(())
    }

    /// Run `body` inside a deflate section, leaving it on every exit path
    ///
    /// When `body` fails, the section and every section `body` left open
    /// inside it are abandoned; nothing is written to the parent and the
    /// parent becomes the active cursor again.
    pub fn with_section<T, F>(&mut self, body: F) -> BinViewResult<T>
    where
        F: FnOnce(&mut Self) -> BinViewResult<T>,
    {
        let depth = self.depth();
        self.begin_section()?;
        match body(self) {
            Ok(value) => {
                self.end_section()?;
                Ok(value)
            }
            Err(error) => {
                if let Some(stack) = self.stack.as_mut() {
                    let abandoned = stack.unwind_to(depth);
                    debug!(abandoned, depth, "abandoned sections after failed body");
                }
                Err(error)
            }
        }
    }

    /// Compress everything written from now on as one unframed deflate
    /// stream, emitted when the writer is closed
    ///
    /// Must be called before any section is entered.
    pub fn compress_all(&mut self) -> BinViewResult<()> {
        let stack = self.stack()?;
        if !stack.is_base() {
            return Err(BinViewError::InvalidState(
                "whole-stream compression inside an open section".to_string(),
            ));
        }
        let origin = stack.top_mut().position()?;
        stack.push_buffer(SectionTag::new(SectionKind::WholeStream, origin));
        debug!(origin, "compressing whole stream");
        Ok(())
    }

    /// Close the writer, failing if any deflate section is still open
    pub fn finish(&mut self) -> BinViewResult<()> {
        let open = self.stack()?.count_kind(SectionKind::Deflate);
        if open > 0 {
            return Err(BinViewError::UnclosedSections(open));
        }
        self.close()
    }
}

impl<S: Write + ResizableStream, Z: PayloadSerializer> BinaryViewWriter<S, Z> {
    /// Truncate or zero-extend the active cursor's stream
    ///
    /// Inside a section this resizes the uncompressed buffer before it is
    /// framed; at the base a buffered file is flushed first.
    pub fn set_length(&mut self, length: u64) -> BinViewResult<()> {
        let mut cursor = self.cursor()?;
        cursor.set_length(length)?;
        trace!(length, in_section = cursor.in_section(), "resized active stream");
        Ok(())
    }
}

impl<S: Write + Seek, Z> Drop for BinaryViewWriter<S, Z> {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            warn!(%error, "failed to close binary view writer");
        }
    }
}
