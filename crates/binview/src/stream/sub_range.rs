//! Bounded window over a parent stream
//!
//! A [`SubRange`] translates every read, write and seek into
//! `[offset, offset + length)` of its parent and never touches bytes outside
//! that window. It borrows the parent and releases nothing of it on drop.

use super::ByteStream;
use crate::error::{BinViewError, BinViewResult};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Window `[offset, offset + length)` over a borrowed parent stream
#[derive(Debug)]
pub struct SubRange<'p, P: ?Sized> {
    parent: &'p mut P,
    base_offset: u64,
    length: u64,
    local_position: u64,
    growable: bool,
    disposed: bool,
}

impl<'p, P: Seek + ?Sized> SubRange<'p, P> {
    /// Window over an existing region of `parent`
    ///
    /// Fails with [`BinViewError::Range`] when the region extends past the
    /// parent's current length.
    pub fn new(parent: &'p mut P, offset: u64, length: u64) -> BinViewResult<Self> {
        let bound = parent.length()?;
        let end = offset.checked_add(length);
        if end.is_none_or(|end| end > bound) {
            return Err(BinViewError::Range {
                offset,
                length,
                bound,
            });
        }
        Ok(Self {
            parent,
            base_offset: offset,
            length,
            local_position: 0,
            growable: false,
            disposed: false,
        })
    }

    /// Empty window at `offset` that grows as it is written
    ///
    /// Only meaningful over an unbounded parent such as an in-memory buffer.
    pub fn growable(parent: &'p mut P, offset: u64) -> BinViewResult<Self> {
        let mut range = Self::new(parent, offset, 0)?;
        range.growable = true;
        Ok(range)
    }

    /// Offset of the window in the parent
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Length of the window
    pub fn len(&self) -> u64 {
        self.length
    }

    /// Whether the window is empty
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Parent offset one past the window
    pub fn end_offset(&self) -> u64 {
        self.base_offset + self.length
    }

    /// Position relative to the window start
    pub fn local_position(&self) -> u64 {
        self.local_position
    }

    /// Bytes left before the window bound
    pub fn remaining_in_range(&self) -> u64 {
        self.length - self.local_position
    }

    /// Move within the window; `0 <= position <= len` is enforced
    pub fn set_local_position(&mut self, position: u64) -> BinViewResult<()> {
        if position > self.length {
            return Err(BinViewError::Range {
                offset: self.base_offset,
                length: position,
                bound: self.length,
            });
        }
        self.local_position = position;
        Ok(())
    }

    /// Stop translating; later reads and writes fail
    pub fn dispose(&mut self) {
        self.disposed = true;
    }

    fn check_live(&self) -> io::Result<()> {
        if self.disposed {
            return Err(io::Error::other("sub-range used after dispose"));
        }
        Ok(())
    }

    fn seek_parent(&mut self) -> io::Result<()> {
        self.parent
            .seek(SeekFrom::Start(self.base_offset + self.local_position))
            .map(|_| ())
    }
}

impl<P: Read + Seek + ?Sized> Read for SubRange<'_, P> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.check_live()?;
        let available = self.remaining_in_range();
        if available == 0 || buf.is_empty() {
            return Ok(0);
        }
        let wanted = buf.len().min(usize::try_from(available).unwrap_or(usize::MAX));
        self.seek_parent()?;
        let read = self.parent.read(&mut buf[..wanted])?;
        if read == 0 {
            // The window promised more bytes than the parent delivered
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("sub-range ended {available} bytes before its bound"),
            ));
        }
        self.local_position += read as u64;
        Ok(read)
    }
}

impl<P: Write + Seek + ?Sized> Write for SubRange<'_, P> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check_live()?;
        let allowed = if self.growable {
            buf.len()
        } else {
            buf.len()
                .min(usize::try_from(self.remaining_in_range()).unwrap_or(usize::MAX))
        };
        if allowed == 0 {
            return Ok(0);
        }
        self.seek_parent()?;
        let written = self.parent.write(&buf[..allowed])?;
        self.local_position += written as u64;
        if self.local_position > self.length {
            self.length = self.local_position;
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check_live()?;
        self.parent.flush()
    }
}

impl<P: Seek + ?Sized> Seek for SubRange<'_, P> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.check_live()?;
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.local_position.checked_add_signed(delta),
            SeekFrom::End(delta) => self.length.checked_add_signed(delta),
        };
        match target {
            Some(position) if position <= self.length => {
                self.local_position = position;
                Ok(position)
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("seek outside sub-range of length {}", self.length),
            )),
        }
    }
}
