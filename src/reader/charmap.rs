//! Byte remapping tables for sequence data

use crate::buffer::ByteBuffer;

/// Nucleotide letters accepted by [`CharMap::nucleotides`] (IUPAC codes)
const IUPAC: &[u8] = b"ACGTUNRYSWKMBDHV";

/// A 256-entry table applied to every sequence byte
///
/// A byte mapped to zero is removed from the sequence and tallied in
/// [`StrippedCounts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharMap([u8; 256]);
impl Default for CharMap {
    fn default() -> Self {
        Self::identity()
    }
}
impl CharMap {
    /// Every byte maps to itself, except NUL which is stripped
    #[must_use]
    pub fn identity() -> Self {
        let mut table = [0u8; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = i as u8;
        }
        Self(table)
    }

    /// ASCII letters are upper-cased, everything else is kept
    #[must_use]
    pub fn uppercase() -> Self {
        let mut map = Self::identity();
        for c in b'a'..=b'z' {
            map.0[c as usize] = c.to_ascii_uppercase();
        }
        map
    }

    /// IUPAC nucleotide codes are upper-cased; every other byte is stripped
    #[must_use]
    pub fn nucleotides() -> Self {
        let mut table = [0u8; 256];
        for &c in IUPAC {
            table[c as usize] = c;
            table[c.to_ascii_lowercase() as usize] = c;
        }
        Self(table)
    }

    /// Sets the target of `from`; a target of zero strips the byte
    #[must_use]
    pub fn set(mut self, from: u8, to: u8) -> Self {
        self.0[from as usize] = to;
        self
    }

    #[inline]
    #[must_use]
    pub fn get(&self, byte: u8) -> u8 {
        self.0[byte as usize]
    }
}

/// Per-byte tally of characters removed by a [`CharMap`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrippedCounts {
    counts: [u64; 256],
    total: u64,
}
impl Default for StrippedCounts {
    fn default() -> Self {
        Self {
            counts: [0; 256],
            total: 0,
        }
    }
}
impl StrippedCounts {
    #[inline]
    fn record(&mut self, byte: u8) {
        self.counts[byte as usize] += 1;
        self.total += 1;
    }

    /// Number of times `byte` was stripped
    #[must_use]
    pub fn count(&self, byte: u8) -> u64 {
        self.counts[byte as usize]
    }

    /// Total number of stripped bytes
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Bytes that were stripped at least once, with their counts
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, n)| **n > 0)
            .map(|(byte, n)| (byte as u8, *n))
    }
}

/// Applies `map` to `sequence[start..]` in place
///
/// When `quality` is given, the quality byte at the position of every stripped
/// sequence byte is removed too; both buffers must hold the same number of
/// bytes from `start` on.
pub(crate) fn remap(
    map: &CharMap,
    sequence: &mut ByteBuffer,
    mut quality: Option<&mut ByteBuffer>,
    start: usize,
    stripped: &mut StrippedCounts,
) {
    let seq = sequence.as_mut_slice();
    let mut write = start;
    for read in start..seq.len() {
        let c = seq[read];
        let m = map.get(c);
        if m == 0 {
            stripped.record(c);
            continue;
        }
        seq[write] = m;
        if let Some(qual) = quality.as_deref_mut() {
            let q = qual.as_mut_slice();
            q[write] = q[read];
        }
        write += 1;
    }
    sequence.truncate_to(write);
    if let Some(qual) = quality {
        qual.truncate_to(write);
    }
}
