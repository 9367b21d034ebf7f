//! `key=value` annotations embedded in sequence headers
//!
//! Headers may carry tokens such as `size=12` (abundance) or `ee=0.35`
//! (expected errors), each preceded by the start of the header or `;` and
//! followed by `;` or the end of the header:
//!
//! ```text
//! >read42;size=12;ee=0.35;sample=A
//! ```
//!
//! Matching is boundary-checked, never a plain substring search: `xsize=5`
//! does not contain a `size=` annotation.

use std::io::{self, Write};
use std::ops::Range;

use memchr::memmem;

use crate::error::{HeaderError, Result};

/// Separator between annotations
pub const SEPARATOR: u8 = b';';

/// Abundance attribute name
pub const SIZE_ATTRIBUTE: &[u8] = b"size=";

/// Expected-error attribute name
pub const EE_ATTRIBUTE: &[u8] = b"ee=";

/// Finds the first well-formed `attribute` token in `header`
///
/// A token is `attribute` followed by one or more digits (digits and `.` when
/// `allow_decimal` is set), preceded by the start of the header or `;`, and
/// followed by `;` or the end of the header. Rejected candidates are skipped
/// and the scan resumes after them.
///
/// # Returns
///
/// The half-open range of the whole `name=value` token, or `None`.
///
/// # Example
///
/// ```
/// use fastxio::header::{find_attribute, SIZE_ATTRIBUTE};
///
/// let header = b"read1;size=12;";
/// assert_eq!(find_attribute(header, SIZE_ATTRIBUTE, false), Some(6..13));
/// assert_eq!(find_attribute(b"xsize=12", SIZE_ATTRIBUTE, false), None);
/// ```
#[must_use]
pub fn find_attribute(header: &[u8], attribute: &[u8], allow_decimal: bool) -> Option<Range<usize>> {
    let hlen = header.len();
    let alen = attribute.len();
    if alen == 0 {
        return None;
    }
    let finder = memmem::Finder::new(attribute);
    let is_value = |c: &u8| c.is_ascii_digit() || (allow_decimal && *c == b'.');

    let mut i = 0;
    while i + alen < hlen {
        let start = i + finder.find(&header[i..])?;
        let value_start = start + alen;

        if start > 0 && header[start - 1] != SEPARATOR {
            i = value_start + 1;
            continue;
        }

        let digits = header[value_start..].iter().take_while(|c| is_value(c)).count();
        if digits == 0 {
            i = value_start + 1;
            continue;
        }

        let end = value_start + digits;
        if end < hlen && header[end] != SEPARATOR {
            // header[end] is neither a value byte nor ';', so no token starts at end + 1
            i = end + 2;
            continue;
        }

        return Some(start..end);
    }
    None
}

/// Reads the abundance carried by a `size=` annotation
///
/// # Returns
///
/// * `Ok(Some(n))` - a `size=n` annotation with `n >= 1`
/// * `Ok(None)` - no annotation
/// * `Err(HeaderError::ZeroAbundance)` - a `size=0` annotation
///
/// # Example
///
/// ```
/// use fastxio::header::abundance;
///
/// assert_eq!(abundance(b"seq1;size=7;ee=0.5").unwrap(), Some(7));
/// assert_eq!(abundance(b"seq1").unwrap(), None);
/// assert!(abundance(b"seq1;size=0").is_err());
/// ```
pub fn abundance(header: &[u8]) -> Result<Option<u64>> {
    let Some(range) = find_attribute(header, SIZE_ATTRIBUTE, false) else {
        return Ok(None);
    };
    let digits = &header[range.start + SIZE_ATTRIBUTE.len()..range.end];
    let value = digits.iter().try_fold(0u64, |acc, &c| {
        acc.checked_mul(10)?.checked_add(u64::from(c - b'0'))
    });
    match value {
        Some(0) => Err(HeaderError::ZeroAbundance.into()),
        Some(n) => Ok(Some(n)),
        None => Err(HeaderError::AbundanceOverflow(String::from_utf8_lossy(digits).into_owned()).into()),
    }
}

/// Reads the value of an `ee=` annotation
///
/// Returns `None` when the annotation is absent or its value is not a valid number.
#[must_use]
pub fn expected_error(header: &[u8]) -> Option<f64> {
    let range = find_attribute(header, EE_ATTRIBUTE, true)?;
    std::str::from_utf8(&header[range.start + EE_ATTRIBUTE.len()..range.end])
        .ok()?
        .parse()
        .ok()
}

/// Writes `header` with its `size=` and/or `ee=` annotations removed
///
/// Each removed token takes its preceding `;` with it; all other text keeps its
/// order. A single trailing `;` left behind by a removed token is dropped. When
/// nothing is requested or found the header is written unchanged.
pub fn write_stripped<W: Write + ?Sized>(
    writer: &mut W,
    header: &[u8],
    strip_size: bool,
    strip_ee: bool,
) -> io::Result<()> {
    let mut ranges: [Option<Range<usize>>; 2] = [
        strip_size
            .then(|| find_attribute(header, SIZE_ATTRIBUTE, false))
            .flatten(),
        strip_ee
            .then(|| find_attribute(header, EE_ATTRIBUTE, true))
            .flatten(),
    ];
    if let [Some(a), Some(b)] = &ranges {
        if a.start > b.start {
            ranges.swap(0, 1);
        }
    }

    let mut found = ranges.iter().flatten().peekable();
    if found.peek().is_none() {
        return writer.write_all(header);
    }

    let mut prev_end = 0;
    for range in found {
        if range.start > prev_end + 1 {
            writer.write_all(&header[prev_end..range.start - 1])?;
        }
        prev_end = range.end;
    }
    if header.len() > prev_end + 1 {
        writer.write_all(&header[prev_end..])?;
    }
    Ok(())
}

/// Returns `header` without its `size=` and/or `ee=` annotations
///
/// See [`write_stripped`].
#[must_use]
pub fn strip_annotations(header: &[u8], strip_size: bool, strip_ee: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(header.len());
    // writing into a Vec cannot fail
    let _ = write_stripped(&mut out, header, strip_size, strip_ee);
    out
}
