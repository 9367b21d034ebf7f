use std::collections::HashMap;
use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use fastxio::{CharMap, FastaWriter, Label, ReaderBuilder, TopKHeap, TopScore};

const DEFAULT_TOP: usize = 10;

/// A retained record, kept until it is evicted from the heap
struct Entry {
    header: Vec<u8>,
    sequence: Vec<u8>,
    abundance: u64,
}

fn parse_args() -> Result<(String, usize)> {
    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("Usage: fastxio <path|-> [k]");
    };
    let top = match args.next() {
        Some(k) => k
            .parse()
            .with_context(|| format!("Invalid number of records: {k}"))?,
        None => DEFAULT_TOP,
    };
    Ok((path, top))
}

/// Heap id of a record; ids are never reused, so indices past `u32::MAX` are an error
fn record_id(index: u64) -> Result<u32> {
    u32::try_from(index).with_context(|| format!("Record {index} exceeds the top-k id range"))
}

fn run(path: &str, top: usize) -> Result<()> {
    let mut reader = ReaderBuilder::default()
        .char_map(CharMap::nucleotides())
        .open(path)
        .with_context(|| format!("Unable to read {path}"))?;

    let mut heap = TopKHeap::new(top);
    let mut entries: HashMap<u32, Entry> = HashMap::new();

    while let Some(record) = reader.next_record()? {
        let abundance = record.abundance()?.unwrap_or(1);
        let score = u32::try_from(abundance).unwrap_or(u32::MAX);

        let full = heap.len() == heap.capacity();
        if full && heap.peek().is_none_or(|min| score <= min.score) {
            continue;
        }
        if full {
            if let Some(evicted) = heap.peek() {
                entries.remove(&evicted.id);
            }
        }

        let id = record_id(record.index())?;
        heap.add(TopScore::new(score, id, record.len() as u32));
        entries.insert(
            id,
            Entry {
                header: record.header().to_vec(),
                sequence: record.sequence().to_vec(),
                abundance,
            },
        );
    }

    log::info!(
        "Read {} {} records ({} lines)",
        reader.record_count(),
        reader.format().map_or_else(|| "empty".to_string(), |f| f.to_string()),
        reader.line_number(),
    );
    if reader.stripped().total() > 0 {
        log::warn!("{} characters were stripped", reader.stripped().total());
        for (byte, count) in reader.stripped().iter() {
            log::warn!("  {:?}: {count}", char::from(byte));
        }
    }
    reader.close();

    let mut writer = FastaWriter::new(io::BufWriter::new(io::stdout().lock()));
    for element in heap.into_sorted_vec().iter().rev() {
        if let Some(entry) = entries.get(&element.id) {
            let label = Label::default().size(entry.abundance);
            writer.write_labeled(&entry.header, &entry.sequence, &label)?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();

    let (path, top) = parse_args()?;
    run(&path, top)?;
    io::stdout().flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Id Tests ====================

    #[test]
    fn test_record_id_in_range() {
        assert_eq!(record_id(1).unwrap(), 1);
        assert_eq!(record_id(u64::from(u32::MAX)).unwrap(), u32::MAX);
    }

    #[test]
    fn test_record_id_past_range_is_error() {
        assert!(record_id(u64::from(u32::MAX) + 1).is_err());
        assert!(record_id(u64::from(u32::MAX) * 2 + 3).is_err());
    }
}
