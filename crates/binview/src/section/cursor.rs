//! The active cursor: whichever stream is on top of the section stack

use crate::stream::{MemoryStream, ResizableStream};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Mutable handle to the top of a [`super::SectionStack`]
#[derive(Debug)]
pub enum ActiveCursor<'a, S> {
    /// The base stream; no section is open
    Base(&'a mut S),
    /// The buffer of the innermost open section
    Section(&'a mut MemoryStream),
}

impl<S> ActiveCursor<'_, S> {
    /// Whether the cursor is inside a section
    pub fn in_section(&self) -> bool {
        matches!(self, Self::Section(_))
    }
}

impl<S: Read> Read for ActiveCursor<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Base(stream) => stream.read(buf),
            Self::Section(stream) => stream.read(buf),
        }
    }
}

impl<S: Write> Write for ActiveCursor<'_, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Base(stream) => stream.write(buf),
            Self::Section(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Base(stream) => stream.flush(),
            Self::Section(stream) => stream.flush(),
        }
    }
}

impl<S: Seek> Seek for ActiveCursor<'_, S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::Base(stream) => stream.seek(pos),
            Self::Section(stream) => stream.seek(pos),
        }
    }
}

impl<S: ResizableStream> ResizableStream for ActiveCursor<'_, S> {
    fn set_length(&mut self, length: u64) -> io::Result<()> {
        match self {
            Self::Base(stream) => stream.set_length(length),
            Self::Section(stream) => stream.set_length(length),
        }
    }
}
