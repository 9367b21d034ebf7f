//! Reusable byte storage shared by the source and reader layers
//!
//! A [`ByteBuffer`] is a growable byte region with a read cursor. Buffers are
//! allocated once per reader and reused across records, so their capacity only
//! ever grows during a session.

use std::io::{self, Read};

use crate::error::{BufferError, Result};

/// Allocation unit used when a buffer grows
pub const BUFFER_ALLOC: usize = 8192;

/// A growable byte buffer with a read cursor
///
/// Invariants: `position() <= len() <= capacity()`.
#[derive(Debug, Default, Clone)]
pub struct ByteBuffer {
    data: Vec<u8>,
    position: usize,
}
impl ByteBuffer {
    /// Creates an empty buffer without allocating
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Releases the storage and resets the buffer to its initial state
    pub fn free(&mut self) {
        self.data = Vec::new();
        self.position = 0;
    }

    /// Number of valid bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of bytes allocated
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Current read cursor
    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// All valid bytes, including those already consumed
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bytes between the cursor and the end of valid data
    #[inline]
    #[must_use]
    pub fn unread(&self) -> &[u8] {
        &self.data[self.position..]
    }

    /// Moves the cursor forward by `n` bytes, clamped to the valid length
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.position = (self.position + n).min(self.data.len());
    }

    /// Drops all valid bytes and rewinds the cursor; capacity is kept
    #[inline]
    pub fn clear(&mut self) {
        self.data.clear();
        self.position = 0;
    }

    /// Ensures at least `additional` bytes of free capacity beyond the current length
    ///
    /// Growth is geometric and rounded to [`BUFFER_ALLOC`]. An allocation failure is
    /// reported as [`BufferError::Allocation`] and never ignored.
    pub fn makespace(&mut self, additional: usize) -> Result<()> {
        let needed = self.data.len() + additional;
        if needed <= self.data.capacity() {
            return Ok(());
        }
        let target = needed
            .max(self.data.capacity() * 2)
            .next_multiple_of(BUFFER_ALLOC);
        self.data
            .try_reserve_exact(target - self.data.len())
            .map_err(|source| BufferError::Allocation {
                requested: target,
                source,
            })?;
        Ok(())
    }

    /// Appends `src`, growing the buffer first if needed
    pub fn extend(&mut self, src: &[u8]) -> Result<()> {
        self.makespace(src.len())?;
        self.data.extend_from_slice(src);
        Ok(())
    }

    /// Appends a single byte
    #[inline]
    pub fn push(&mut self, byte: u8) -> Result<()> {
        self.makespace(1)?;
        self.data.push(byte);
        Ok(())
    }

    /// Shrinks the logical length to `len`; never cuts below the cursor
    #[inline]
    pub fn truncate_to(&mut self, len: usize) {
        self.data.truncate(len.max(self.position));
    }

    /// Shrinks the logical length to the first embedded NUL, or to the first
    /// whitespace byte when `at_whitespace` is set
    ///
    /// # Returns
    ///
    /// The number of bytes removed.
    pub fn truncate(&mut self, at_whitespace: bool) -> usize {
        let cut = self
            .data
            .iter()
            .position(|&c| c == 0 || (at_whitespace && matches!(c, b' ' | b'\t' | b'\n' | b'\r')))
            .unwrap_or(self.data.len());
        let before = self.data.len();
        self.truncate_to(cut);
        before - self.data.len()
    }

    /// Discards consumed bytes and moves the unread tail to the front
    pub fn compact(&mut self) {
        if self.position > 0 {
            self.data.drain(..self.position);
            self.position = 0;
        }
    }

    /// Reads at most `max` bytes from `reader` and appends them
    ///
    /// Interrupted reads are retried. Returns the number of bytes appended;
    /// zero means the reader is exhausted.
    pub fn fill_from<R: Read + ?Sized>(&mut self, reader: &mut R, max: usize) -> Result<usize> {
        self.makespace(max)?;
        let start = self.data.len();
        self.data.resize(start + max, 0);
        let read = loop {
            match reader.read(&mut self.data[start..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.data.truncate(start);
                    return Err(e.into());
                }
            }
        };
        self.data.truncate(start + read);
        Ok(read)
    }
}
