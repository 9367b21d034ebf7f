use std::cell::OnceCell;
use std::io::{self, Write};

use crate::error::Result;
use crate::header;

/// A view of the record most recently read by a [`FastxReader`](super::FastxReader)
///
/// The view borrows the reader's buffers and is invalidated by the next read;
/// copy the slices to keep them.
#[derive(Clone, Copy)]
pub struct RefRecord<'a> {
    /// Header text without the leading marker
    header: &'a [u8],
    /// Sequence after character mapping
    sequence: &'a [u8],
    /// Quality string, FASTQ only
    quality: Option<&'a [u8]>,
    /// 1-based record number
    index: u64,
    /// Decompressed byte offset of the header marker
    offset: u64,
    /// 1-based line of the header
    line: u64,
    /// Abundance parsed on first request
    abundance: &'a OnceCell<Option<u64>>,
}
impl<'a> RefRecord<'a> {
    pub(crate) fn new(
        header: &'a [u8],
        sequence: &'a [u8],
        quality: Option<&'a [u8]>,
        index: u64,
        offset: u64,
        line: u64,
        abundance: &'a OnceCell<Option<u64>>,
    ) -> Self {
        Self {
            header,
            sequence,
            quality,
            index,
            offset,
            line,
            abundance,
        }
    }

    #[inline]
    #[must_use]
    pub fn header(&self) -> &'a [u8] {
        self.header
    }

    #[inline]
    #[must_use]
    pub fn sequence(&self) -> &'a [u8] {
        self.sequence
    }

    /// Quality string; `None` for FASTA records
    #[inline]
    #[must_use]
    pub fn quality(&self) -> Option<&'a [u8]> {
        self.quality
    }

    /// Sequence length
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// 1-based position of the record in the file
    #[inline]
    #[must_use]
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Byte offset of the record start in the decompressed stream
    #[inline]
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// 1-based line number of the header line
    #[inline]
    #[must_use]
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Abundance from the header's `size=` annotation
    ///
    /// Parsed on the first call and cached for the lifetime of the record.
    /// `Ok(None)` means the header carries no annotation; `size=0` is an error.
    pub fn abundance(&self) -> Result<Option<u64>> {
        if let Some(cached) = self.abundance.get() {
            return Ok(*cached);
        }
        let value = header::abundance(self.header)?;
        let _ = self.abundance.set(value);
        Ok(value)
    }

    /// Expected errors from the header's `ee=` annotation
    #[must_use]
    pub fn expected_error(&self) -> Option<f64> {
        header::expected_error(self.header)
    }

    /// Writes the header with the requested annotations removed
    pub fn write_header_stripped<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        strip_size: bool,
        strip_ee: bool,
    ) -> io::Result<()> {
        header::write_stripped(writer, self.header, strip_size, strip_ee)
    }
}
impl std::fmt::Debug for RefRecord<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefRecord")
            .field("index", &self.index)
            .field("header", &String::from_utf8_lossy(self.header))
            .field("len", &self.sequence.len())
            .field("fastq", &self.quality.is_some())
            .finish()
    }
}
