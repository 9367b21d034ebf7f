//! # fastxio
//!
//! Streaming FASTA/FASTQ input with transparent gzip/bzip2 decompression,
//! `;key=value;` header annotations, and a fixed-capacity top-k heap.
//!
//! The crate is layered bottom-up:
//!
//! * [`ByteBuffer`] - growable byte storage reused across records
//! * [`source`] - raw byte streams over plain, gzip, or bzip2 transports
//! * [`reader`] - record framing, format detection, and character mapping
//! * [`header`] - locating, parsing, and stripping `size=`/`ee=` annotations
//! * [`topk`] - retention of the highest-scoring elements
//! * [`write`] - FASTA output with wrapping and header relabeling
//!
//! ## Example
//!
//! ```rust
//! use fastxio::{CharMap, ReaderBuilder};
//! use std::io::Cursor;
//!
//! let data = b">seq1;size=7;ee=0.5\nacgt\n>seq2\nAC-GT\n".to_vec();
//! let mut reader = ReaderBuilder::default()
//!     .char_map(CharMap::nucleotides())
//!     .build_from_reader(Box::new(Cursor::new(data)))
//!     .unwrap();
//!
//! let record = reader.next_record().unwrap().unwrap();
//! assert_eq!(record.sequence(), b"ACGT");
//! assert_eq!(record.abundance().unwrap(), Some(7));
//!
//! let record = reader.next_record().unwrap().unwrap();
//! assert_eq!(record.abundance().unwrap(), None);
//! assert_eq!(reader.stripped().count(b'-'), 1);
//! ```

mod buffer;
pub mod error;
pub mod header;
pub mod reader;
pub mod source;
pub mod topk;
pub mod write;

pub use buffer::{ByteBuffer, BUFFER_ALLOC};
pub use error::{Error, Result};
pub use reader::{
    CharMap, FastxReader, Format, ReaderBuilder, ReaderOptions, RefRecord, StrippedCounts,
};
pub use source::{Compression, SourceStream, DEFAULT_CHUNK_SIZE};
pub use topk::{TopKHeap, TopScore};
pub use write::{FastaWriter, Label, DEFAULT_WIDTH};
