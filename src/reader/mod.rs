//! Streaming FASTA/FASTQ reader
//!
//! [`FastxReader`] pulls bytes from a [`SourceStream`] and splits them into
//! records, reusing the same header/sequence/quality buffers for every record.
//! The format is latched from the first non-whitespace byte of the input:
//! `>` selects FASTA and `@` selects FASTQ. Framing errors after that point are
//! fatal and leave the reader unusable.
//!
//! ```no_run
//! use fastxio::{CharMap, ReaderBuilder};
//!
//! # fn main() -> fastxio::Result<()> {
//! let mut reader = ReaderBuilder::default()
//!     .truncate_at_space(true)
//!     .char_map(CharMap::nucleotides())
//!     .open("reads.fq.gz")?;
//!
//! while let Some(record) = reader.next_record()? {
//!     let size = record.abundance()?.unwrap_or(1);
//!     println!("{} {} {}", record.index(), record.len(), size);
//! }
//! # Ok(())
//! # }
//! ```

mod charmap;
mod record;

use std::cell::OnceCell;
use std::fmt;
use std::path::Path;

pub use charmap::{CharMap, StrippedCounts};
pub use record::RefRecord;

use crate::buffer::ByteBuffer;
use crate::error::{RecordError, Result};
use crate::source::{BoxedRead, Compression, SourceStream};

/// Record framing of an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `>` header followed by one or more sequence lines
    Fasta,
    /// `@` header, sequence, `+` line, quality
    Fastq,
}
impl Format {
    /// The byte that starts every record header
    #[must_use]
    pub fn marker(self) -> u8 {
        match self {
            Self::Fasta => b'>',
            Self::Fastq => b'@',
        }
    }
}
impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fasta => write!(f, "FASTA"),
            Self::Fastq => write!(f, "FASTQ"),
        }
    }
}

/// Per-record parsing options
#[derive(Debug, Clone, Copy, Default)]
pub struct ReaderOptions {
    /// Cut headers at their first whitespace byte
    pub truncate_at_space: bool,
    /// Table applied to every sequence byte
    pub char_map: Option<CharMap>,
}

/// Builder for [`FastxReader`]
///
/// # Example
///
/// ```no_run
/// use fastxio::{CharMap, ReaderBuilder};
///
/// let reader = ReaderBuilder::default()
///     .char_map(CharMap::uppercase())
///     .chunk_size(1 << 20)
///     .open("input.fasta")?;
/// # Ok::<(), fastxio::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReaderBuilder {
    options: ReaderOptions,
    chunk_size: Option<usize>,
}
impl ReaderBuilder {
    #[must_use]
    pub fn truncate_at_space(mut self, truncate: bool) -> Self {
        self.options.truncate_at_space = truncate;
        self
    }

    #[must_use]
    pub fn char_map(mut self, map: CharMap) -> Self {
        self.options.char_map = Some(map);
        self
    }

    /// Maximum number of bytes pulled from the source per fill
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Opens `path` (or standard input for `-`)
    pub fn open<P: AsRef<Path>>(self, path: P) -> Result<FastxReader> {
        let source = SourceStream::open(path)?;
        Ok(self.build_from_source(source))
    }

    /// Reads from an arbitrary reader of unknown size
    pub fn build_from_reader(self, reader: BoxedRead) -> Result<FastxReader> {
        let source = SourceStream::from_reader(reader, None)?;
        Ok(self.build_from_source(source))
    }

    /// Wraps an already opened source
    #[must_use]
    pub fn build_from_source(self, mut source: SourceStream) -> FastxReader {
        if let Some(chunk_size) = self.chunk_size {
            source.set_chunk_size(chunk_size);
        }
        let mut reader = FastxReader::new(source);
        reader.options = self.options;
        reader
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No byte inspected yet
    Unknown,
    Reading(Format),
    Exhausted,
    /// A fatal error was returned
    Failed,
}

/// A streaming FASTA/FASTQ reader
pub struct FastxReader {
    source: SourceStream,
    state: State,
    options: ReaderOptions,

    header: ByteBuffer,
    sequence: ByteBuffer,
    quality: ByteBuffer,
    /// Scratch buffer for FASTQ `+` lines
    plus: ByteBuffer,

    /// Decompressed bytes consumed
    offset: u64,
    /// Lines consumed
    line_number: u64,
    /// Records read
    record_count: u64,

    /// Whether the buffers hold a complete record
    has_record: bool,
    record_offset: u64,
    record_line: u64,
    abundance: OnceCell<Option<u64>>,

    stripped: StrippedCounts,
    header_bytes_truncated: u64,
}
impl FastxReader {
    /// Creates a reader with default options over `source`
    #[must_use]
    pub fn new(source: SourceStream) -> Self {
        Self {
            source,
            state: State::Unknown,
            options: ReaderOptions::default(),
            header: ByteBuffer::new(),
            sequence: ByteBuffer::new(),
            quality: ByteBuffer::new(),
            plus: ByteBuffer::new(),
            offset: 0,
            line_number: 0,
            record_count: 0,
            has_record: false,
            record_offset: 0,
            record_line: 0,
            abundance: OnceCell::new(),
            stripped: StrippedCounts::default(),
            header_bytes_truncated: 0,
        }
    }

    /// Opens `path` with default options
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        ReaderBuilder::default().open(path)
    }

    /// Reads the next record using the configured options
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - a view of the record, valid until the next call
    /// * `Ok(None)` - the input is exhausted
    /// * `Err(_)` - a fatal error; every later call returns [`RecordError::Poisoned`]
    pub fn next_record(&mut self) -> Result<Option<RefRecord<'_>>> {
        let options = self.options;
        self.next_record_with(options.truncate_at_space, options.char_map.as_ref())
    }

    /// Reads the next record with per-call options
    pub fn next_record_with(
        &mut self,
        truncate_at_space: bool,
        char_map: Option<&CharMap>,
    ) -> Result<Option<RefRecord<'_>>> {
        match self.advance(truncate_at_space, char_map) {
            Ok(true) => Ok(self.record()),
            Ok(false) => Ok(None),
            Err(e) => {
                self.state = State::Failed;
                self.has_record = false;
                Err(e)
            }
        }
    }

    /// The record most recently read, if the last call produced one
    #[must_use]
    pub fn record(&self) -> Option<RefRecord<'_>> {
        if !self.has_record {
            return None;
        }
        let quality = matches!(self.state, State::Reading(Format::Fastq))
            .then(|| self.quality.as_slice());
        Some(RefRecord::new(
            self.header.as_slice(),
            self.sequence.as_slice(),
            quality,
            self.record_count,
            self.record_offset,
            self.record_line,
            &self.abundance,
        ))
    }

    /// Latches the format if needed and reports whether the input is FASTQ
    pub fn is_fastq(&mut self) -> Result<bool> {
        Ok(self.detect()? == Some(Format::Fastq))
    }

    /// The latched format; `None` before the first byte was inspected or for empty input
    #[must_use]
    pub fn format(&self) -> Option<Format> {
        match self.state {
            State::Reading(format) => Some(format),
            _ => None,
        }
    }

    /// On-disk bytes consumed, for progress against [`size`](Self::size)
    #[must_use]
    pub fn position(&self) -> u64 {
        self.source.position()
    }

    /// On-disk size; `None` for pipes
    #[must_use]
    pub fn size(&self) -> Option<u64> {
        self.source.size()
    }

    /// The source's transport; `None` once closed
    #[must_use]
    pub fn compression(&self) -> Option<Compression> {
        self.source.compression()
    }

    /// Number of lines consumed so far
    #[must_use]
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Number of records read so far
    #[must_use]
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Sequence bytes removed by the character map, by byte value
    #[must_use]
    pub fn stripped(&self) -> &StrippedCounts {
        &self.stripped
    }

    /// Header bytes removed by whitespace truncation
    #[must_use]
    pub fn header_bytes_truncated(&self) -> u64 {
        self.header_bytes_truncated
    }

    /// Releases the source and all buffers; further reads return `Ok(None)`
    ///
    /// Closing twice is a no-op.
    pub fn close(&mut self) {
        self.source.close();
        for buffer in [
            &mut self.header,
            &mut self.sequence,
            &mut self.quality,
            &mut self.plus,
        ] {
            buffer.free();
        }
        self.has_record = false;
        if self.state != State::Failed {
            self.state = State::Exhausted;
        }
    }

    fn advance(&mut self, truncate_at_space: bool, char_map: Option<&CharMap>) -> Result<bool> {
        self.has_record = false;
        let format = match self.state {
            State::Failed => return Err(RecordError::Poisoned.into()),
            State::Exhausted => return Ok(false),
            State::Reading(format) => format,
            State::Unknown => match self.detect()? {
                Some(format) => format,
                None => return Ok(false),
            },
        };

        if !self.skip_blank_lines()? {
            self.finish();
            return Ok(false);
        }

        self.begin_record();
        match format {
            Format::Fasta => self.read_fasta(char_map)?,
            Format::Fastq => self.read_fastq(char_map)?,
        }

        let removed = self.header.truncate(truncate_at_space);
        self.header_bytes_truncated += removed as u64;
        self.record_count += 1;
        self.has_record = true;
        Ok(true)
    }

    /// Skips leading whitespace and latches the format from the first other byte
    fn detect(&mut self) -> Result<Option<Format>> {
        match self.state {
            State::Reading(format) => return Ok(Some(format)),
            State::Exhausted => return Ok(None),
            State::Failed => return Err(RecordError::Poisoned.into()),
            State::Unknown => {}
        }
        loop {
            match self.peek_byte()? {
                None => {
                    self.finish();
                    return Ok(None);
                }
                Some(c) if c.is_ascii_whitespace() => {
                    if c == b'\n' {
                        self.line_number += 1;
                    }
                    self.consume(1);
                }
                Some(c) => {
                    let format = match c {
                        b'>' => Format::Fasta,
                        b'@' => Format::Fastq,
                        _ => {
                            self.state = State::Failed;
                            return Err(RecordError::UnrecognizedFormat {
                                byte: char::from(c),
                                line: self.line_number + 1,
                            }
                            .into());
                        }
                    };
                    log::debug!("Detected {format} input");
                    self.state = State::Reading(format);
                    return Ok(Some(format));
                }
            }
        }
    }

    fn read_fasta(&mut self, char_map: Option<&CharMap>) -> Result<()> {
        self.expect_marker(Format::Fasta)?;
        self.read_line_into(Buf::Header)?;

        while let Some(c) = self.peek_byte()? {
            if c == b'>' {
                break;
            }
            let start = self.sequence.len();
            self.read_line_into(Buf::Sequence)?;
            if let Some(map) = char_map {
                charmap::remap(map, &mut self.sequence, None, start, &mut self.stripped);
            }
        }
        Ok(())
    }

    fn read_fastq(&mut self, char_map: Option<&CharMap>) -> Result<()> {
        self.expect_marker(Format::Fastq)?;
        self.read_line_into(Buf::Header)?;

        loop {
            match self.peek_byte()? {
                None => {
                    return Err(RecordError::MissingPlusLine {
                        record: self.record_count + 1,
                        line: self.line_number,
                    }
                    .into())
                }
                Some(b'+') => break,
                Some(_) => self.read_line_into(Buf::Sequence)?,
            }
        }

        self.consume(1);
        self.read_line_into(Buf::Plus)?;
        if !self.plus.is_empty() && self.plus.as_slice() != self.header.as_slice() {
            return Err(RecordError::PlusLineMismatch {
                record: self.record_count + 1,
                line: self.line_number,
            }
            .into());
        }

        while self.quality.len() < self.sequence.len() {
            if self.peek_byte()?.is_none() {
                break;
            }
            self.read_line_into(Buf::Quality)?;
        }
        if self.quality.len() != self.sequence.len() {
            return Err(RecordError::QualityLengthMismatch {
                record: self.record_count + 1,
                line: self.line_number,
                seq_len: self.sequence.len(),
                qual_len: self.quality.len(),
            }
            .into());
        }

        if let Some(map) = char_map {
            charmap::remap(
                map,
                &mut self.sequence,
                Some(&mut self.quality),
                0,
                &mut self.stripped,
            );
        }
        Ok(())
    }

    /// Consumes the header marker of `format` at the current position
    fn expect_marker(&mut self, format: Format) -> Result<()> {
        match self.peek_byte()? {
            Some(c) if c == format.marker() => {
                self.consume(1);
                Ok(())
            }
            Some(c) => Err(RecordError::MissingHeaderMarker {
                expected: char::from(format.marker()),
                found: char::from(c),
                line: self.line_number + 1,
            }
            .into()),
            None => Err(RecordError::TruncatedRecord {
                record: self.record_count + 1,
                line: self.line_number,
            }
            .into()),
        }
    }

    /// Skips empty lines between records; returns false at end of input
    fn skip_blank_lines(&mut self) -> Result<bool> {
        loop {
            match self.peek_byte()? {
                None => return Ok(false),
                Some(b'\n') => {
                    self.line_number += 1;
                    self.consume(1);
                }
                Some(b'\r') => self.consume(1),
                Some(_) => return Ok(true),
            }
        }
    }

    fn begin_record(&mut self) {
        self.header.clear();
        self.sequence.clear();
        self.quality.clear();
        self.plus.clear();
        self.abundance = OnceCell::new();
        self.record_offset = self.offset;
        self.record_line = self.line_number + 1;
    }

    fn finish(&mut self) {
        if self.state != State::Exhausted {
            log::debug!(
                "Finished reading: {} records, {} lines",
                self.record_count,
                self.line_number
            );
        }
        self.state = State::Exhausted;
    }

    /// Returns the next unread byte without consuming it, pulling more input if needed
    fn peek_byte(&mut self) -> Result<Option<u8>> {
        loop {
            if let Some(&c) = self.source.buffer().unread().first() {
                return Ok(Some(c));
            }
            if self.source.fill_buffer()? == 0 {
                return Ok(None);
            }
        }
    }

    fn consume(&mut self, n: usize) {
        self.source.buffer_mut().advance(n);
        self.offset += n as u64;
    }

    /// Appends the next line to one of the record buffers
    ///
    /// The line terminator and a trailing `\r` are not copied. A final line
    /// without terminator is accepted.
    fn read_line_into(&mut self, target: Buf) -> Result<()> {
        let dst = match target {
            Buf::Header => &mut self.header,
            Buf::Sequence => &mut self.sequence,
            Buf::Quality => &mut self.quality,
            Buf::Plus => &mut self.plus,
        };
        let start = dst.len();
        let mut consumed = 0;
        loop {
            let unread = self.source.buffer().unread();
            if let Some(pos) = memchr::memchr(b'\n', unread) {
                dst.extend(&unread[..pos])?;
                self.source.buffer_mut().advance(pos + 1);
                consumed += pos + 1;
                break;
            }
            let n = unread.len();
            dst.extend(unread)?;
            self.source.buffer_mut().advance(n);
            consumed += n;
            if self.source.fill_buffer()? == 0 {
                break;
            }
        }
        if dst.len() > start && dst.as_slice().last() == Some(&b'\r') {
            dst.truncate_to(dst.len() - 1);
        }
        self.offset += consumed as u64;
        if consumed > 0 {
            self.line_number += 1;
        }
        Ok(())
    }
}

/// Selects the destination of [`FastxReader::read_line_into`]
#[derive(Clone, Copy)]
enum Buf {
    Header,
    Sequence,
    Quality,
    Plus,
}
