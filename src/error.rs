use std::collections::TryReserveError;
use std::path::PathBuf;

use crate::source::Compression;

/// Custom Result type for fastxio operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the fastxio library, encompassing all possible error cases
/// that can occur while opening, reading, and annotating sequence files.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Errors related to opening or pulling bytes from a source
    #[error("Error reading source: {0}")]
    SourceError(#[from] SourceError),

    /// Errors related to the framing of FASTA/FASTQ records
    #[error("Error parsing record: {0}")]
    RecordError(#[from] RecordError),

    /// Errors related to header annotations
    #[error("Error parsing header annotation: {0}")]
    HeaderError(#[from] HeaderError),

    /// Errors that occur while growing a buffer
    #[error("Error allocating buffer: {0}")]
    BufferError(#[from] BufferError),

    /// Standard I/O errors
    #[error("Error with IO: {0}")]
    IoError(#[from] std::io::Error),
}
impl Error {
    /// Checks if the error was caused by malformed or unsupported input
    ///
    /// Input errors abort a run: a corrupt sequence file should never be read
    /// as a shorter but otherwise valid one.
    ///
    /// # Returns
    ///
    /// * `true` for unreadable paths, framing and annotation errors, and unsupported transports
    /// * `false` for I/O failures mid-stream, allocation failures, and misuse of a closed stream
    #[must_use]
    pub fn is_fatal_input(&self) -> bool {
        match self {
            Self::RecordError(err) => !matches!(err, RecordError::Poisoned),
            Self::HeaderError(_) => true,
            Self::SourceError(err) => matches!(
                err,
                SourceError::Open { .. }
                    | SourceError::UnsupportedCompression(_)
                    | SourceError::TransportDisabled(_)
            ),
            Self::BufferError(_) | Self::IoError(_) => false,
        }
    }
}

/// Errors that can occur while opening or filling a source stream
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    /// The path could not be opened for reading
    #[error("Unable to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The content starts with the magic bytes of a compression format this crate does not read
    ///
    /// # Arguments
    /// * `&'static str` - Name of the detected format
    #[error("Unsupported compression format detected: {0}")]
    UnsupportedCompression(&'static str),

    /// The content is compressed with a transport whose cargo feature is disabled
    #[error("Support for {0} input was not compiled in")]
    TransportDisabled(Compression),

    /// The stream was used after it was closed
    #[error("Source stream is already closed")]
    Closed,
}

/// Errors that can occur while splitting a stream into FASTA/FASTQ records
#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    /// The first non-whitespace byte is neither `>` nor `@`
    #[error("File type not recognized: found {byte:?} at line {line} (expected '>' or '@')")]
    UnrecognizedFormat { byte: char, line: u64 },

    /// A record does not start with the header marker of the detected format
    #[error("Expected {expected:?} at start of record on line {line}, found {found:?}")]
    MissingHeaderMarker {
        expected: char,
        found: char,
        line: u64,
    },

    /// A FASTQ record has no `+` separator line before the end of input
    #[error("Missing '+' separator line in FASTQ record {record} (line {line})")]
    MissingPlusLine { record: u64, line: u64 },

    /// The `+` line carries a header that differs from the `@` line
    #[error("FASTQ '+' line does not repeat the header of record {record} (line {line})")]
    PlusLineMismatch { record: u64, line: u64 },

    /// Sequence and quality lengths differ
    #[error(
        "Sequence and quality lengths differ in FASTQ record {record} (line {line}): sequence {seq_len}, quality {qual_len}"
    )]
    QualityLengthMismatch {
        record: u64,
        line: u64,
        seq_len: usize,
        qual_len: usize,
    },

    /// The input ended in the middle of a record
    #[error("Truncated record {record} at end of input (line {line})")]
    TruncatedRecord { record: u64, line: u64 },

    /// A previous call already failed with a fatal error
    #[error("Reader is unusable after an earlier fatal error")]
    Poisoned,
}

/// Errors raised while interpreting `key=value` header annotations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// A `size=0` annotation was found
    #[error("Invalid (zero) abundance annotation in header")]
    ZeroAbundance,

    /// A `size=` annotation that does not fit in 64 bits
    ///
    /// # Arguments
    /// * `String` - The digits that were found
    #[error("Abundance annotation out of range: {0}")]
    AbundanceOverflow(String),
}

/// Errors raised while growing a [`ByteBuffer`](crate::ByteBuffer)
#[derive(thiserror::Error, Debug)]
pub enum BufferError {
    /// The allocator refused to grow the buffer
    #[error("Unable to allocate {requested} bytes: {source}")]
    Allocation {
        requested: usize,
        source: TryReserveError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Classification Tests ====================

    #[test]
    fn test_record_errors_are_fatal_input() {
        let error: Error = RecordError::QualityLengthMismatch {
            record: 1,
            line: 1,
            seq_len: 4,
            qual_len: 3,
        }
        .into();
        assert!(error.is_fatal_input());
    }

    #[test]
    fn test_poisoned_is_not_input_error() {
        let error: Error = RecordError::Poisoned.into();
        assert!(!error.is_fatal_input());
    }

    #[test]
    fn test_header_errors_are_fatal_input() {
        let error: Error = HeaderError::ZeroAbundance.into();
        assert!(error.is_fatal_input());
    }

    #[test]
    fn test_source_error_classification() {
        let error: Error = SourceError::UnsupportedCompression("zstd").into();
        assert!(error.is_fatal_input());

        let error: Error = SourceError::Closed.into();
        assert!(!error.is_fatal_input());

        let error: Error = SourceError::Open {
            path: PathBuf::from("missing.fa"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .into();
        assert!(error.is_fatal_input());

        let error: Error = std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into();
        assert!(!error.is_fatal_input());
    }

    // ==================== Display Tests ====================

    #[test]
    fn test_open_error_mentions_path() {
        let error = SourceError::Open {
            path: PathBuf::from("reads.fq.gz"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(format!("{error}").contains("reads.fq.gz"));
    }

    #[test]
    fn test_unrecognized_format_display() {
        let error = RecordError::UnrecognizedFormat { byte: 'X', line: 3 };
        let error_str = format!("{error}");
        assert!(error_str.contains("'X'"));
        assert!(error_str.contains('3'));
    }

    #[test]
    fn test_length_mismatch_display() {
        let error = RecordError::QualityLengthMismatch {
            record: 7,
            line: 25,
            seq_len: 150,
            qual_len: 149,
        };
        let error_str = format!("{error}");
        assert!(error_str.contains("150"));
        assert!(error_str.contains("149"));
        assert!(error_str.contains("25"));
    }

    #[test]
    fn test_transport_disabled_display() {
        let error = SourceError::TransportDisabled(Compression::Bzip2);
        assert!(format!("{error}").contains("bzip2"));
    }

    #[test]
    fn test_abundance_overflow_display() {
        let error = HeaderError::AbundanceOverflow("99999999999999999999999".to_string());
        assert!(format!("{error}").contains("99999999999999999999999"));
    }

    // ==================== Conversion Tests ====================

    #[test]
    fn test_error_from_io_error() {
        let error: Error = std::io::Error::other("boom").into();
        assert!(matches!(error, Error::IoError(_)));
    }

    #[test]
    fn test_error_debug_output() {
        let error = Error::SourceError(SourceError::Closed);
        assert!(format!("{error:?}").contains("SourceError"));
    }
}
