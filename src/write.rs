//! FASTA output
//!
//! [`FastaWriter`] emits headers and wrapped sequences, optionally rewriting the
//! header with fresh `size=`/`ee=`/`clusterid=` annotations or replacing it with
//! a relabel prefix and ordinal.
//!
//! # Example
//!
//! ```rust
//! use fastxio::{FastaWriter, Label};
//!
//! let mut writer = FastaWriter::new(Vec::new()).with_width(4);
//! writer.write_record(b"seq1;size=3", b"ACGTAC").unwrap();
//! writer
//!     .write_labeled(b"seq2;size=3", b"GG", &Label::default().size(10))
//!     .unwrap();
//!
//! let output = writer.into_inner();
//! assert_eq!(output, b">seq1;size=3\nACGT\nAC\n>seq2;size=10;\nGG\n");
//! ```

use std::io::{self, Write};

use crate::header::{self, SEPARATOR};

/// Default line width for sequence output
pub const DEFAULT_WIDTH: usize = 80;

/// Header rewriting applied by [`FastaWriter::write_labeled`]
///
/// Every field is optional. With no prefix the original header is kept, minus
/// any `size=`/`ee=` annotation that is being replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Label<'a> {
    /// Replaces the header with `<prefix><ordinal>`
    pub prefix: Option<&'a str>,
    pub ordinal: u64,
    /// Written as `size=<n>;`
    pub size: Option<u64>,
    /// Written as `ee=<x>;` with four decimals
    pub ee: Option<f64>,
    /// Written as `clusterid=<n>;`
    pub cluster_id: Option<u64>,
}
impl<'a> Label<'a> {
    #[must_use]
    pub fn relabel(mut self, prefix: &'a str, ordinal: u64) -> Self {
        self.prefix = Some(prefix);
        self.ordinal = ordinal;
        self
    }

    #[must_use]
    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn ee(mut self, ee: f64) -> Self {
        self.ee = Some(ee);
        self
    }

    #[must_use]
    pub fn cluster_id(mut self, cluster_id: u64) -> Self {
        self.cluster_id = Some(cluster_id);
        self
    }
}

/// A FASTA writer over any [`Write`] sink
///
/// Headers are written with their leading `>`; sequences are split into lines
/// of at most `width` bytes, where a width of zero disables wrapping.
pub struct FastaWriter<W: Write> {
    inner: W,
    width: usize,
    /// Header assembly area, reused across records
    scratch: Vec<u8>,
}
impl<W: Write> FastaWriter<W> {
    /// Creates a writer wrapping sequences at [`DEFAULT_WIDTH`]
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            width: DEFAULT_WIDTH,
            scratch: Vec::new(),
        }
    }

    /// Sets the sequence line width; `0` writes each sequence on one line
    #[must_use]
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Writes `>header` followed by a newline
    pub fn write_header(&mut self, header: &[u8]) -> io::Result<()> {
        self.inner.write_all(b">")?;
        self.inner.write_all(header)?;
        self.inner.write_all(b"\n")
    }

    /// Writes the header with any `size=` annotation removed
    pub fn write_header_strip_size(&mut self, header: &[u8]) -> io::Result<()> {
        self.inner.write_all(b">")?;
        header::write_stripped(&mut self.inner, header, true, false)?;
        self.inner.write_all(b"\n")
    }

    /// Writes `sequence` wrapped at the configured width
    ///
    /// With wrapping enabled an empty sequence produces no line at all.
    pub fn write_sequence(&mut self, sequence: &[u8]) -> io::Result<()> {
        if self.width == 0 {
            self.inner.write_all(sequence)?;
            return self.inner.write_all(b"\n");
        }
        for line in sequence.chunks(self.width) {
            self.inner.write_all(line)?;
            self.inner.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Writes a header as-is followed by its sequence
    pub fn write_record(&mut self, header: &[u8], sequence: &[u8]) -> io::Result<()> {
        self.write_header(header)?;
        self.write_sequence(sequence)
    }

    /// Writes a record whose header carries a fresh `ee=` annotation
    pub fn write_record_ee(&mut self, header: &[u8], sequence: &[u8], ee: f64) -> io::Result<()> {
        self.write_labeled(header, sequence, &Label::default().ee(ee))
    }

    /// Writes a record under the header `<prefix><ordinal>`
    pub fn write_relabel(&mut self, prefix: &str, ordinal: u64, sequence: &[u8]) -> io::Result<()> {
        self.write_labeled(b"", sequence, &Label::default().relabel(prefix, ordinal))
    }

    /// Writes a record with its header rewritten according to `label`
    ///
    /// Annotations are appended in the order `size`, `ee`, `clusterid`, each
    /// terminated by `;`.
    pub fn write_labeled(
        &mut self,
        header: &[u8],
        sequence: &[u8],
        label: &Label<'_>,
    ) -> io::Result<()> {
        self.scratch.clear();
        if let Some(prefix) = label.prefix {
            self.scratch.extend_from_slice(prefix.as_bytes());
            self.scratch
                .extend_from_slice(itoa::Buffer::new().format(label.ordinal).as_bytes());
        } else {
            header::write_stripped(
                &mut self.scratch,
                header,
                label.size.is_some(),
                label.ee.is_some(),
            )?;
        }

        if let Some(size) = label.size {
            self.annotate(b"size=");
            self.scratch
                .extend_from_slice(itoa::Buffer::new().format(size).as_bytes());
            self.scratch.push(SEPARATOR);
        }
        if let Some(ee) = label.ee {
            self.annotate(b"ee=");
            write!(self.scratch, "{ee:.4}")?;
            self.scratch.push(SEPARATOR);
        }
        if let Some(cluster_id) = label.cluster_id {
            self.annotate(b"clusterid=");
            self.scratch
                .extend_from_slice(itoa::Buffer::new().format(cluster_id).as_bytes());
            self.scratch.push(SEPARATOR);
        }

        self.inner.write_all(b">")?;
        self.inner.write_all(&self.scratch)?;
        self.inner.write_all(b"\n")?;
        self.write_sequence(sequence)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    /// Mutable access to the underlying sink
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Starts an annotation, adding a separator unless the header already ends with one
    fn annotate(&mut self, key: &[u8]) {
        if !self.scratch.is_empty() && self.scratch.last() != Some(&SEPARATOR) {
            self.scratch.push(SEPARATOR);
        }
        self.scratch.extend_from_slice(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output<F>(width: usize, f: F) -> String
    where
        F: FnOnce(&mut FastaWriter<Vec<u8>>) -> io::Result<()>,
    {
        let mut writer = FastaWriter::new(Vec::new()).with_width(width);
        f(&mut writer).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    // ==================== Sequence Tests ====================

    #[test]
    fn test_default_width() {
        let writer = FastaWriter::new(Vec::new());
        assert_eq!(writer.width(), DEFAULT_WIDTH);
    }

    #[test]
    fn test_sequence_wrapping() {
        let out = output(3, |w| w.write_sequence(b"ACGTACGT"));
        assert_eq!(out, "ACG\nTAC\nGT\n");
    }

    #[test]
    fn test_sequence_exact_multiple_of_width() {
        let out = output(4, |w| w.write_sequence(b"ACGTACGT"));
        assert_eq!(out, "ACGT\nACGT\n");
    }

    #[test]
    fn test_sequence_no_wrapping() {
        let out = output(0, |w| w.write_sequence(&[b'A'; 200]));
        assert_eq!(out.len(), 201);
        assert!(out.ends_with('\n'));
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn test_empty_sequence() {
        assert_eq!(output(80, |w| w.write_sequence(b"")), "");
        assert_eq!(output(0, |w| w.write_sequence(b"")), "\n");
    }

    // ==================== Header Tests ====================

    #[test]
    fn test_write_record() {
        let out = output(80, |w| w.write_record(b"seq1 sample", b"ACGT"));
        assert_eq!(out, ">seq1 sample\nACGT\n");
    }

    #[test]
    fn test_write_header_strip_size() {
        let out = output(80, |w| w.write_header_strip_size(b"seq1;size=7;ee=0.5"));
        assert_eq!(out, ">seq1;ee=0.5\n");
        let out = output(80, |w| w.write_header_strip_size(b"seq1"));
        assert_eq!(out, ">seq1\n");
    }

    #[test]
    fn test_write_record_ee_replaces_existing() {
        let out = output(80, |w| w.write_record_ee(b"seq1;ee=9.9;size=2", b"AC", 0.123_456));
        assert_eq!(out, ">seq1;size=2;ee=0.1235;\nAC\n");
    }

    #[test]
    fn test_write_record_ee_after_trailing_separator() {
        let out = output(80, |w| w.write_record_ee(b"seq1;", b"AC", 1.0));
        assert_eq!(out, ">seq1;ee=1.0000;\nAC\n");
    }

    // ==================== Label Tests ====================

    #[test]
    fn test_write_relabel() {
        let out = output(80, |w| w.write_relabel("Otu", 12, b"ACGT"));
        assert_eq!(out, ">Otu12\nACGT\n");
    }

    #[test]
    fn test_labeled_size_replaces_existing() {
        let label = Label::default().size(42);
        let out = output(80, |w| w.write_labeled(b"seq1;size=7;sample=A", b"AC", &label));
        assert_eq!(out, ">seq1;sample=A;size=42;\nAC\n");
    }

    #[test]
    fn test_labeled_keeps_size_without_replacement() {
        let label = Label::default().cluster_id(3);
        let out = output(80, |w| w.write_labeled(b"seq1;size=7;", b"AC", &label));
        assert_eq!(out, ">seq1;size=7;clusterid=3;\nAC\n");
    }

    #[test]
    fn test_labeled_relabel_with_all_annotations() {
        let label = Label::default()
            .relabel("Seq", 5)
            .size(100)
            .ee(0.5)
            .cluster_id(0);
        let out = output(2, |w| w.write_labeled(b"ignored;size=1", b"ACG", &label));
        assert_eq!(out, ">Seq5;size=100;ee=0.5000;clusterid=0;\nAC\nG\n");
    }

    #[test]
    fn test_labeled_empty_header() {
        let label = Label::default().size(1);
        let out = output(80, |w| w.write_labeled(b"", b"A", &label));
        assert_eq!(out, ">size=1;\nA\n");
    }
}
