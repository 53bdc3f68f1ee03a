//! Streaming snapshot writer
//!
//! The header goes out uncompressed; every record after it is fed through
//! one LZ4 frame. Each table segment (its table record plus all of its row
//! records) is assembled in memory before it reaches the compressor, since
//! the table id has to precede its rows. Only one segment is buffered at a
//! time.

use super::errors::{SnapshotError, SnapshotResult};
use super::{ROW_MARK, SNAPSHOT_MAGIC, SNAPSHOT_VERSION, TABLE_MARK};
use crate::codec::{put_bytes, put_str, transport, FrameSink};
use crate::mvcc::TxnError;
use crate::value::{encode_row, Key, Value};

/// Counters for one written snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotStats {
    pub tables: usize,
    pub rows: usize,
    /// Record bytes before compression
    pub raw_len: u64,
    /// Length of the final printable text
    pub text_len: usize,
}

pub struct SnapshotWriter {
    sink: FrameSink<Vec<u8>>,
    segment: Vec<u8>,
    stats: SnapshotStats,
}

impl SnapshotWriter {
    pub fn new() -> Self {
        let mut out = Vec::with_capacity(4096);
        out.extend_from_slice(SNAPSHOT_MAGIC);
        out.push(SNAPSHOT_VERSION);
        Self {
            sink: FrameSink::new(out),
            segment: Vec::new(),
            stats: SnapshotStats::default(),
        }
    }

    /// Writes one table segment.
    ///
    /// `rows` may yield errors from a live store; the first one aborts the
    /// segment and is returned.
    pub fn table<I, E>(&mut self, id: &str, rows: I) -> SnapshotResult<()>
    where
        I: IntoIterator<Item = Result<(Key, Value), E>>,
        E: Into<TxnError>,
    {
        self.segment.clear();
        self.segment.push(TABLE_MARK);
        put_str(&mut self.segment, id);

        for row in rows {
            let (key, value) = row.map_err(|e| SnapshotError::Source(e.into()))?;
            self.segment.push(ROW_MARK);
            put_bytes(&mut self.segment, &encode_row(&key, &value));
            self.stats.rows += 1;
        }

        self.sink.write_all(&self.segment)?;
        self.stats.tables += 1;
        Ok(())
    }

    /// Closes the frame and returns the printable text.
    pub fn finish(mut self) -> SnapshotResult<(String, SnapshotStats)> {
        self.stats.raw_len = self.sink.uncompressed_len();
        let bytes = self.sink.finish()?;
        let text = transport::encode(&bytes);
        self.stats.text_len = text.len();
        Ok((text, self.stats))
    }
}

impl Default for SnapshotWriter {
    fn default() -> Self {
        Self::new()
    }
}
