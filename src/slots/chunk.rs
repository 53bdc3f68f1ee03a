//! Splitting long text across numbered slots
//!
//! Text longer than the chunk limit is stored as `ceil(len / max)` slots
//! named `<prefix>.0`, `<prefix>.1`, ... and reassembled in index order.
//! Empty text takes no chunks.

use super::errors::{SlotError, SlotResult};
use super::SlotStore;

/// Number of chunks `len` bytes need at `max` bytes per chunk.
pub fn chunk_count(len: usize, max: usize) -> usize {
    if max == 0 {
        return 0;
    }
    len.div_ceil(max)
}

/// Splits `text` into pieces of at most `max` bytes, never inside a UTF-8
/// character. Persisted text is ASCII, so every piece but the last is
/// exactly `max` bytes.
pub fn split_chunks(text: &str, max: usize) -> Vec<&str> {
    let mut chunks = Vec::with_capacity(chunk_count(text.len(), max));
    let mut rest = text;
    while !rest.is_empty() && max > 0 {
        let mut end = max.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // `max` is smaller than the next character.
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let (head, tail) = rest.split_at(end);
        chunks.push(head);
        rest = tail;
    }
    chunks
}

pub fn chunk_name(prefix: &str, index: u32) -> String {
    format!("{}.{}", prefix, index)
}

/// Writes `text` as chunks under `prefix` and returns the chunk count.
///
/// Chunks beyond the new count are removed: at least up to `previous`, the
/// count the prefix was last known to hold, and further while slots still
/// exist, which cleans up after an interrupted earlier write.
pub fn write_chunks(
    slots: &dyn SlotStore,
    prefix: &str,
    text: &str,
    max: usize,
    previous: u32,
) -> SlotResult<u32> {
    let chunks = split_chunks(text, max);
    for (index, chunk) in chunks.iter().enumerate() {
        slots.set(&chunk_name(prefix, index as u32), chunk)?;
    }
    let count = chunks.len() as u32;
    remove_stale(slots, prefix, count, previous)?;
    Ok(count)
}

fn remove_stale(slots: &dyn SlotStore, prefix: &str, from: u32, previous: u32) -> SlotResult<()> {
    let mut index = from;
    loop {
        let name = chunk_name(prefix, index);
        if index >= previous && slots.get(&name)?.is_none() {
            return Ok(());
        }
        slots.remove(&name)?;
        index += 1;
    }
}

/// Reassembles `count` chunks stored under `prefix`.
pub fn read_chunks(slots: &dyn SlotStore, prefix: &str, count: u32) -> SlotResult<String> {
    let mut text = String::new();
    for index in 0..count {
        let name = chunk_name(prefix, index);
        match slots.get(&name)? {
            Some(chunk) => text.push_str(&chunk),
            None => return Err(SlotError::MissingChunk { name }),
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::MemorySlots;

    #[test]
    fn test_chunk_count() {
        assert_eq!(chunk_count(0, 10), 0);
        assert_eq!(chunk_count(1, 10), 1);
        assert_eq!(chunk_count(10, 10), 1);
        assert_eq!(chunk_count(11, 10), 2);
    }

    #[test]
    fn test_split_respects_limit() {
        let text = "abcdefghij".repeat(5);
        let chunks = split_chunks(&text, 7);
        assert_eq!(chunks.len(), chunk_count(text.len(), 7));
        assert!(chunks.iter().all(|c| c.len() <= 7));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_never_cuts_characters() {
        let chunks = split_chunks("aé", 2);
        assert_eq!(chunks, vec!["a", "é"]);
    }

    #[test]
    fn test_write_then_read() {
        let slots = MemorySlots::new();
        let text = "x".repeat(25);
        let count = write_chunks(&slots, "db.parts.a", &text, 10, 0).unwrap();
        assert_eq!(count, 3);
        assert_eq!(read_chunks(&slots, "db.parts.a", count).unwrap(), text);
    }

    #[test]
    fn test_shrinking_write_removes_stale_chunks() {
        let slots = MemorySlots::new();
        write_chunks(&slots, "db.parts.a", &"x".repeat(50), 10, 0).unwrap();
        let count = write_chunks(&slots, "db.parts.a", "short", 10, 5).unwrap();
        assert_eq!(count, 1);
        assert_eq!(slots.names().unwrap(), vec!["db.parts.a.0".to_string()]);
    }

    #[test]
    fn test_cleanup_past_recorded_count() {
        let slots = MemorySlots::new();
        // An interrupted write left four chunks though only two are recorded.
        write_chunks(&slots, "db.wal.b", &"y".repeat(40), 10, 0).unwrap();
        write_chunks(&slots, "db.wal.b", "z", 10, 2).unwrap();
        assert_eq!(slots.names().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_chunk_is_reported() {
        let slots = MemorySlots::new();
        write_chunks(&slots, "db.parts.a", &"x".repeat(30), 10, 0).unwrap();
        slots.remove("db.parts.a.1").unwrap();
        assert!(matches!(
            read_chunks(&slots, "db.parts.a", 3),
            Err(SlotError::MissingChunk { name }) if name == "db.parts.a.1"
        ));
    }
}
