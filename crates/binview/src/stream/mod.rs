//! Positioned byte streams
//!
//! Any `Seek` type is a [`ByteStream`]: it has a position and a length.
//! [`MemoryStream`] is the growable in-memory variant used for section
//! buffers; file-backed streams are plain [`std::fs::File`] handles wrapped
//! in `BufReader`/`BufWriter`. A stream borrowed as `&mut T` is never closed
//! by the view that uses it.

mod sub_range;

pub use sub_range::SubRange;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};

/// Position and length queries over a seekable stream
pub trait ByteStream: Seek {
    /// Current position from the start of the stream
    fn position(&mut self) -> io::Result<u64> {
        self.stream_position()
    }

    /// Move to an absolute position
    fn set_position(&mut self, position: u64) -> io::Result<()> {
        self.seek(SeekFrom::Start(position)).map(|_| ())
    }

    /// Total length, leaving the position untouched
    fn length(&mut self) -> io::Result<u64> {
        let position = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        if position != end {
            self.seek(SeekFrom::Start(position))?;
        }
        Ok(end)
    }

    /// Bytes between the position and the end
    fn remaining(&mut self) -> io::Result<u64> {
        let position = self.stream_position()?;
        Ok(self.length()?.saturating_sub(position))
    }
}

impl<T: Seek + ?Sized> ByteStream for T {}

/// Streams whose length can be changed in place
pub trait ResizableStream: Seek {
    /// Truncate or zero-extend to `length` bytes
    ///
    /// In-memory streams clamp their position to the new length; files keep
    /// theirs, and reads past the end return nothing.
    fn set_length(&mut self, length: u64) -> io::Result<()>;
}

impl ResizableStream for MemoryStream {
    fn set_length(&mut self, length: u64) -> io::Result<()> {
        let length = usize::try_from(length).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("length {length} exceeds the address space"),
            )
        })?;
        self.set_len(length);
        Ok(())
    }
}

impl ResizableStream for File {
    fn set_length(&mut self, length: u64) -> io::Result<()> {
        self.set_len(length)
    }
}

impl ResizableStream for BufWriter<File> {
    fn set_length(&mut self, length: u64) -> io::Result<()> {
        self.flush()?;
        self.get_ref().set_len(length)
    }
}

impl ResizableStream for BufReader<File> {
    fn set_length(&mut self, length: u64) -> io::Result<()> {
        self.get_ref().set_len(length)?;
        // Drop buffered bytes that may now lie past the end
        self.seek(SeekFrom::Current(0)).map(|_| ())
    }
}

impl<T: ResizableStream + ?Sized> ResizableStream for &mut T {
    fn set_length(&mut self, length: u64) -> io::Result<()> {
        (**self).set_length(length)
    }
}

/// Growable in-memory byte stream
#[derive(Debug, Default, Clone)]
pub struct MemoryStream {
    inner: Cursor<Vec<u8>>,
}

impl MemoryStream {
    /// Empty stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty stream with preallocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Cursor::new(Vec::with_capacity(capacity)),
        }
    }

    /// Number of bytes held
    pub fn len(&self) -> usize {
        self.inner.get_ref().len()
    }

    /// Whether the stream holds no bytes
    pub fn is_empty(&self) -> bool {
        self.inner.get_ref().is_empty()
    }

    /// Truncate or zero-extend to `length` bytes
    ///
    /// The position is clamped to the new length.
    pub fn set_len(&mut self, length: usize) {
        self.inner.get_mut().resize(length, 0);
        if self.inner.position() > length as u64 {
            self.inner.set_position(length as u64);
        }
    }

    /// Contents as a slice
    pub fn as_slice(&self) -> &[u8] {
        self.inner.get_ref()
    }

    /// Consume the stream, returning its contents
    pub fn into_inner(self) -> Vec<u8> {
        self.inner.into_inner()
    }

    /// Drop the contents and free the allocation
    pub fn release(&mut self) {
        self.inner = Cursor::new(Vec::new());
    }
}

impl From<Vec<u8>> for MemoryStream {
    fn from(data: Vec<u8>) -> Self {
        Self {
            inner: Cursor::new(data),
        }
    }
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}
