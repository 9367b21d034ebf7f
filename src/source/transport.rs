//! Transport implementations behind [`SourceStream`](super::SourceStream)
//!
//! Each transport wraps the raw byte source in a [`CountingReader`] so the
//! number of on-disk (compressed) bytes consumed can be reported for progress,
//! independently of how many decompressed bytes were produced.

use std::fmt;
use std::io::{self, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use auto_impl::auto_impl;

/// Boxed raw byte source
pub type BoxedRead = Box<dyn Read + Send>;

/// Compression transport of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Uncompressed text
    Plain,
    /// gzip, including multi-member files
    Gzip,
    /// bzip2, including concatenated streams
    Bzip2,
}
impl Compression {
    /// Identifies the transport from the leading bytes of a source
    ///
    /// # Returns
    ///
    /// * `Ok(Compression)` - for plain, gzip, and bzip2 content
    /// * `Err(&'static str)` - the name of a recognized but unsupported format
    pub fn detect(magic: &[u8]) -> std::result::Result<Self, &'static str> {
        if magic.starts_with(&GZIP_MAGIC) {
            Ok(Self::Gzip)
        } else if magic.starts_with(BZIP2_MAGIC) {
            Ok(Self::Bzip2)
        } else if magic.starts_with(&ZSTD_MAGIC) {
            Err("zstd")
        } else if magic.starts_with(&XZ_MAGIC) {
            Err("xz")
        } else {
            Ok(Self::Plain)
        }
    }
}
impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Gzip => write!(f, "gzip"),
            Self::Bzip2 => write!(f, "bzip2"),
        }
    }
}

pub(crate) const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
pub(crate) const BZIP2_MAGIC: &[u8; 3] = b"BZh";
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];
const XZ_MAGIC: [u8; 6] = [0xfd, b'7', b'z', b'X', b'Z', 0x00];

/// Longest magic sequence inspected by [`Compression::detect`]
pub(crate) const MAGIC_LEN: usize = XZ_MAGIC.len();

/// The capability every transport provides: read more bytes and report progress
///
/// Dropping a transport releases it.
#[auto_impl(&mut, Box)]
pub trait Transport {
    /// Reads decompressed bytes into `buf`; `Ok(0)` signals end of input
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Raw bytes consumed from the underlying source so far
    fn raw_position(&self) -> u64;

    /// The transport kind
    fn compression(&self) -> Compression;
}

/// A reader that counts the bytes pulled through it
pub struct CountingReader<R> {
    inner: R,
    count: Arc<AtomicU64>,
}
impl<R: Read> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared handle on the byte counter
    #[must_use]
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.count)
    }
}
impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Uncompressed transport
pub struct PlainTransport {
    inner: CountingReader<BoxedRead>,
}
impl PlainTransport {
    #[must_use]
    pub fn new(inner: CountingReader<BoxedRead>) -> Self {
        Self { inner }
    }
}
impl Transport for PlainTransport {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
    fn raw_position(&self) -> u64 {
        self.inner.count.load(Ordering::Relaxed)
    }
    fn compression(&self) -> Compression {
        Compression::Plain
    }
}

/// gzip transport backed by `flate2`
#[cfg(feature = "gzip")]
pub struct GzipTransport {
    decoder: flate2::read::MultiGzDecoder<CountingReader<BoxedRead>>,
    count: Arc<AtomicU64>,
}
#[cfg(feature = "gzip")]
impl GzipTransport {
    #[must_use]
    pub fn new(inner: CountingReader<BoxedRead>) -> Self {
        let count = inner.counter();
        Self {
            decoder: flate2::read::MultiGzDecoder::new(inner),
            count,
        }
    }
}
#[cfg(feature = "gzip")]
impl Transport for GzipTransport {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.decoder.read(buf)
    }
    fn raw_position(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
    fn compression(&self) -> Compression {
        Compression::Gzip
    }
}

/// bzip2 transport backed by the `bzip2` crate
#[cfg(feature = "bzip2")]
pub struct Bzip2Transport {
    decoder: bzip2::read::MultiBzDecoder<CountingReader<BoxedRead>>,
    count: Arc<AtomicU64>,
}
#[cfg(feature = "bzip2")]
impl Bzip2Transport {
    #[must_use]
    pub fn new(inner: CountingReader<BoxedRead>) -> Self {
        let count = inner.counter();
        Self {
            decoder: bzip2::read::MultiBzDecoder::new(inner),
            count,
        }
    }
}
#[cfg(feature = "bzip2")]
impl Transport for Bzip2Transport {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.decoder.read(buf)
    }
    fn raw_position(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
    fn compression(&self) -> Compression {
        Compression::Bzip2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Detection Tests ====================

    #[test]
    fn test_detect_plain() {
        assert_eq!(Compression::detect(b">seq1\nACGT"), Ok(Compression::Plain));
        assert_eq!(Compression::detect(b"@r1\n"), Ok(Compression::Plain));
        assert_eq!(Compression::detect(b""), Ok(Compression::Plain));
    }

    #[test]
    fn test_detect_gzip() {
        assert_eq!(
            Compression::detect(&[0x1f, 0x8b, 0x08, 0x00]),
            Ok(Compression::Gzip)
        );
    }

    #[test]
    fn test_detect_bzip2() {
        assert_eq!(Compression::detect(b"BZh91AY"), Ok(Compression::Bzip2));
    }

    #[test]
    fn test_detect_partial_magic_is_plain() {
        assert_eq!(Compression::detect(&[0x1f]), Ok(Compression::Plain));
        assert_eq!(Compression::detect(b"BZ"), Ok(Compression::Plain));
    }

    #[test]
    fn test_detect_unsupported() {
        assert_eq!(Compression::detect(&[0x28, 0xb5, 0x2f, 0xfd, 0x00]), Err("zstd"));
        assert_eq!(Compression::detect(&XZ_MAGIC), Err("xz"));
    }

    // ==================== Counting Tests ====================

    #[test]
    fn test_counting_reader_counts() {
        let src: BoxedRead = Box::new(io::Cursor::new(b"ACGTACGT".to_vec()));
        let mut transport = PlainTransport::new(CountingReader::new(src));
        let mut buf = [0u8; 3];
        assert_eq!(transport.read_chunk(&mut buf).unwrap(), 3);
        assert_eq!(transport.raw_position(), 3);
        let mut rest = [0u8; 16];
        assert_eq!(transport.read_chunk(&mut rest).unwrap(), 5);
        assert_eq!(transport.raw_position(), 8);
        assert_eq!(transport.compression(), Compression::Plain);
    }

    #[cfg(feature = "gzip")]
    #[test]
    fn test_gzip_transport_reports_raw_bytes() {
        use std::io::Write;

        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder.write_all(b">seq1\nACGT\n").unwrap();
        let compressed = encoder.finish().unwrap();
        let raw_len = compressed.len() as u64;

        let src: BoxedRead = Box::new(io::Cursor::new(compressed));
        let mut transport = GzipTransport::new(CountingReader::new(src));
        let mut out = Vec::new();
        let mut buf = [0u8; 4];
        loop {
            let n = transport.read_chunk(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b">seq1\nACGT\n");
        assert_eq!(transport.raw_position(), raw_len);
    }
}
