//! Byte sources with transparent decompression
//!
//! A [`SourceStream`] turns a path (or any reader) into a sequence of raw bytes,
//! regardless of whether the content is plain text, gzip, or bzip2. The
//! transport is chosen once, by inspecting the leading bytes, and is fixed for
//! the lifetime of the stream.

mod transport;

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

pub use transport::{BoxedRead, Compression, CountingReader, PlainTransport, Transport};
#[cfg(feature = "bzip2")]
pub use transport::Bzip2Transport;
#[cfg(feature = "gzip")]
pub use transport::GzipTransport;

use transport::MAGIC_LEN;

use crate::buffer::ByteBuffer;
use crate::error::{Error, Result, SourceError};

/// Default upper bound on the number of bytes pulled by one [`SourceStream::fill_buffer`]
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// A raw byte stream over one transport, with a staging buffer
pub struct SourceStream {
    /// The transport; `None` once the stream is closed
    transport: Option<Box<dyn Transport + Send>>,

    /// Staging area for bytes not yet consumed by the reader
    buffer: ByteBuffer,

    /// Total on-disk size, if known
    size: Option<u64>,

    /// Set once the transport has reported end of input
    eof: bool,

    /// Maximum bytes pulled per fill
    chunk_size: usize,
}
impl SourceStream {
    /// Opens `path` for reading; `-` reads standard input
    ///
    /// Non-regular files (pipes, sockets, devices) are treated as streams of unknown size.
    /// Any failure to read the path, including the first read used for transport
    /// detection, is reported as [`SourceError::Open`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (reader, size) = open_raw(path)?;
        Self::from_reader(reader, size).map_err(|e| match e {
            Error::IoError(source) => SourceError::Open {
                path: path.to_path_buf(),
                source,
            }
            .into(),
            other => other,
        })
    }

    /// Wraps an arbitrary reader; `size` is its on-disk length when known
    ///
    /// The leading bytes are inspected to select the transport.
    pub fn from_reader(mut reader: BoxedRead, size: Option<u64>) -> Result<Self> {
        let mut magic = Vec::with_capacity(MAGIC_LEN);
        (&mut reader)
            .take(MAGIC_LEN as u64)
            .read_to_end(&mut magic)?;

        let compression =
            Compression::detect(&magic).map_err(SourceError::UnsupportedCompression)?;

        // the sniffed prefix is replayed in front of the remaining input
        let chained: BoxedRead = Box::new(io::Cursor::new(magic).chain(reader));
        let counting = CountingReader::new(chained);
        let transport = build_transport(compression, counting)?;
        log::debug!("Selected {compression} transport");

        Ok(Self {
            transport: Some(transport),
            buffer: ByteBuffer::new(),
            size,
            eof: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Sets the maximum number of bytes pulled by one fill
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size.max(1);
    }

    /// Pulls up to one chunk of additional bytes into the staging buffer
    ///
    /// Consumed bytes are discarded first. This is a blocking read.
    ///
    /// # Returns
    ///
    /// The number of bytes added; `0` signals end of input.
    pub fn fill_buffer(&mut self) -> Result<usize> {
        let transport = self.transport.as_mut().ok_or(SourceError::Closed)?;
        if self.eof {
            return Ok(0);
        }
        self.buffer.compact();
        let read = self
            .buffer
            .fill_from(&mut TransportReader(transport.as_mut()), self.chunk_size)?;
        if read == 0 {
            self.eof = true;
        }
        log::trace!(
            "Filled {read} bytes (raw position {})",
            transport.raw_position()
        );
        Ok(read)
    }

    /// Total on-disk size in bytes; `None` for pipes and other streams of unknown length
    #[must_use]
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// On-disk bytes consumed so far, comparable to [`size`](Self::size)
    #[must_use]
    pub fn position(&self) -> u64 {
        self.transport.as_ref().map_or(0, |t| t.raw_position())
    }

    /// The selected transport; `None` once closed
    #[must_use]
    pub fn compression(&self) -> Option<Compression> {
        self.transport.as_ref().map(|t| t.compression())
    }

    #[must_use]
    pub fn is_pipe(&self) -> bool {
        self.size.is_none()
    }

    /// True once the transport reported end of input
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    /// The staging buffer
    #[must_use]
    pub fn buffer(&self) -> &ByteBuffer {
        &self.buffer
    }

    /// Mutable access to the staging buffer, used to advance its cursor
    pub fn buffer_mut(&mut self) -> &mut ByteBuffer {
        &mut self.buffer
    }

    /// Releases the transport and the staging buffer; closing twice is a no-op
    pub fn close(&mut self) {
        if self.transport.take().is_some() {
            self.buffer.free();
            self.eof = true;
        }
    }
}

/// Resolves `path` to a raw reader and its on-disk size
///
/// `-` is standard input. Directories are rejected up front.
fn open_raw(path: &Path) -> Result<(BoxedRead, Option<u64>)> {
    if path.as_os_str() == "-" {
        log::debug!("Opening standard input");
        return Ok((Box::new(io::stdin()), None));
    }
    let open_error = |source: io::Error| SourceError::Open {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(open_error)?;
    let metadata = file.metadata().map_err(open_error)?;
    if metadata.is_dir() {
        return Err(open_error(io::Error::new(
            io::ErrorKind::InvalidInput,
            "is a directory",
        ))
        .into());
    }
    let size = metadata.is_file().then(|| metadata.len());
    log::debug!(
        "Opening {} ({})",
        path.display(),
        size.map_or_else(|| "pipe".to_string(), |s| format!("{s} bytes"))
    );
    Ok((Box::new(file), size))
}

/// Adapts a transport to [`Read`] for [`ByteBuffer::fill_from`]
struct TransportReader<'a>(&'a mut (dyn Transport + Send));
impl Read for TransportReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read_chunk(buf)
    }
}

fn build_transport(
    compression: Compression,
    inner: CountingReader<BoxedRead>,
) -> Result<Box<dyn Transport + Send>> {
    match compression {
        Compression::Plain => Ok(Box::new(PlainTransport::new(inner))),
        #[cfg(feature = "gzip")]
        Compression::Gzip => Ok(Box::new(GzipTransport::new(inner))),
        #[cfg(feature = "bzip2")]
        Compression::Bzip2 => Ok(Box::new(Bzip2Transport::new(inner))),
        #[allow(unreachable_patterns)]
        disabled => Err(SourceError::TransportDisabled(disabled).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn plain(bytes: &[u8]) -> SourceStream {
        SourceStream::from_reader(Box::new(io::Cursor::new(bytes.to_vec())), None).unwrap()
    }

    fn drain(stream: &mut SourceStream) -> Vec<u8> {
        while stream.fill_buffer().unwrap() > 0 {}
        stream.buffer().as_slice().to_vec()
    }

    // ==================== Open Tests ====================

    #[test]
    fn test_open_missing_file() {
        let result = SourceStream::open("/definitely/not/here.fa");
        assert!(matches!(
            result,
            Err(Error::SourceError(SourceError::Open { .. }))
        ));
    }

    #[test]
    fn test_open_directory_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SourceStream::open(dir.path()).err().unwrap();
        assert!(matches!(
            err,
            Error::SourceError(SourceError::Open { ref path, .. }) if path == dir.path()
        ));
        assert!(err.is_fatal_input());
    }

    #[test]
    fn test_open_missing_file_is_fatal_input() {
        let err = SourceStream::open("/definitely/not/here.fq").err().unwrap();
        assert!(err.is_fatal_input());
    }

    #[test]
    fn test_dash_opens_standard_input() {
        let (_reader, size) = open_raw(Path::new("-")).unwrap();
        assert_eq!(size, None);
    }

    #[test]
    fn test_open_raw_regular_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b">a\n").unwrap();
        file.flush().unwrap();
        let (_reader, size) = open_raw(file.path()).unwrap();
        assert_eq!(size, Some(3));
    }

    #[test]
    fn test_open_regular_file_reports_size() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b">seq1\nACGT\n").unwrap();
        file.flush().unwrap();

        let mut stream = SourceStream::open(file.path()).unwrap();
        assert_eq!(stream.size(), Some(11));
        assert!(!stream.is_pipe());
        assert_eq!(stream.compression(), Some(Compression::Plain));
        assert_eq!(drain(&mut stream), b">seq1\nACGT\n");
        assert_eq!(stream.position(), 11);
    }

    #[test]
    fn test_from_reader_without_size_is_pipe() {
        let stream = plain(b">a\nAC\n");
        assert!(stream.is_pipe());
        assert_eq!(stream.size(), None);
    }

    #[test]
    fn test_unsupported_compression_rejected() {
        let result = SourceStream::from_reader(
            Box::new(io::Cursor::new(vec![0x28, 0xb5, 0x2f, 0xfd, 0, 0, 0, 0])),
            None,
        );
        assert!(matches!(
            result,
            Err(Error::SourceError(SourceError::UnsupportedCompression("zstd")))
        ));
    }

    #[cfg(not(feature = "bzip2"))]
    #[test]
    fn test_disabled_transport_rejected() {
        let result = SourceStream::from_reader(
            Box::new(io::Cursor::new(b"BZh91AY&SY".to_vec())),
            None,
        );
        assert!(matches!(
            result,
            Err(Error::SourceError(SourceError::TransportDisabled(
                Compression::Bzip2
            )))
        ));
    }

    #[cfg(not(feature = "gzip"))]
    #[test]
    fn test_disabled_gzip_transport_rejected() {
        let result = SourceStream::from_reader(
            Box::new(io::Cursor::new(vec![0x1f, 0x8b, 0x08, 0, 0, 0])),
            None,
        );
        assert!(matches!(
            result,
            Err(Error::SourceError(SourceError::TransportDisabled(
                Compression::Gzip
            )))
        ));
    }

    // ==================== Fill Tests ====================

    #[test]
    fn test_fill_replays_sniffed_prefix() {
        let mut stream = plain(b">s");
        assert_eq!(drain(&mut stream), b">s");
        assert!(stream.is_eof());
    }

    #[test]
    fn test_fill_respects_chunk_size() {
        let mut stream = plain(b"@r1\nACGT\n+\nIIII\n");
        stream.set_chunk_size(5);
        assert_eq!(stream.fill_buffer().unwrap(), 5);
        assert_eq!(stream.buffer().as_slice(), b"@r1\nA");
    }

    #[test]
    fn test_fill_discards_consumed_bytes() {
        let mut stream = plain(b"0123456789");
        stream.set_chunk_size(4);
        stream.fill_buffer().unwrap();
        stream.buffer_mut().advance(3);
        stream.fill_buffer().unwrap();
        assert_eq!(stream.buffer().as_slice(), b"34567");
        assert_eq!(stream.buffer().position(), 0);
    }

    #[test]
    fn test_empty_input() {
        let mut stream = plain(b"");
        assert_eq!(stream.fill_buffer().unwrap(), 0);
        assert_eq!(stream.fill_buffer().unwrap(), 0);
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn test_gzip_transparent() {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b">seq1;size=3\nACGT\n").unwrap();
        let compressed = encoder.finish().unwrap();
        let size = compressed.len() as u64;

        let mut stream =
            SourceStream::from_reader(Box::new(io::Cursor::new(compressed)), Some(size)).unwrap();
        assert_eq!(stream.compression(), Some(Compression::Gzip));
        assert_eq!(drain(&mut stream), b">seq1;size=3\nACGT\n");
        assert_eq!(stream.position(), size);
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn test_gzip_multi_member() {
        let mut data = Vec::new();
        for part in [&b">a\nAC\n"[..], &b">b\nGT\n"[..]] {
            let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
            encoder.write_all(part).unwrap();
            data.extend(encoder.finish().unwrap());
        }
        let mut stream = SourceStream::from_reader(Box::new(io::Cursor::new(data)), None).unwrap();
        assert_eq!(drain(&mut stream), b">a\nAC\n>b\nGT\n");
    }

    #[cfg(feature = "bzip2")]
    #[test]
    fn test_bzip2_transparent() {
        let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::best());
        encoder.write_all(b"@r1\nACGT\n+\nIIII\n").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut stream =
            SourceStream::from_reader(Box::new(io::Cursor::new(compressed)), None).unwrap();
        assert_eq!(stream.compression(), Some(Compression::Bzip2));
        assert_eq!(drain(&mut stream), b"@r1\nACGT\n+\nIIII\n");
    }

    // ==================== Close Tests ====================

    #[test]
    fn test_close_is_idempotent() {
        let mut stream = plain(b">a\nAC\n");
        stream.fill_buffer().unwrap();
        stream.close();
        assert!(stream.is_closed());
        assert_eq!(stream.buffer().capacity(), 0);
        stream.close();
        assert!(stream.is_closed());
        assert_eq!(stream.compression(), None);
    }

    #[test]
    fn test_fill_after_close_fails() {
        let mut stream = plain(b">a\nAC\n");
        stream.close();
        assert!(matches!(
            stream.fill_buffer(),
            Err(Error::SourceError(SourceError::Closed))
        ));
    }
}
