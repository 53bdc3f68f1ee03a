//! In-memory WAL and its persisted text form
//!
//! The log holds every entry committed since the last snapshot save. A WAL
//! flush persists all of them to the inactive WAL side; a snapshot save
//! trims the ones the snapshot already covers.
//!
//! Persisted text is the transport encoding of:
//!
//! ```text
//! 'WLOG' | 0x01 | LZ4 frame( entry* )
//! ```

use super::errors::{WalError, WalResult};
use super::record::{WalEntry, WalMutation, ENTRY_MARK};
use crate::codec::{
    compress, decompress, transport, ByteReader, ChecksumPolicy, CodecError, CodecResult,
};
use crate::mvcc::TxnId;

const WAL_MAGIC: &[u8; 4] = b"WLOG";
const WAL_FORMAT_VERSION: u8 = 0x01;

#[derive(Debug, Clone)]
pub struct WalLog {
    entries: Vec<WalEntry>,
    next_seq: u64,
}

impl WalLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 1,
        }
    }

    /// Log resuming from replayed entries, which must be in sequence order.
    pub fn from_entries(entries: Vec<WalEntry>) -> Self {
        let next_seq = entries.last().map_or(1, |e| e.seq + 1);
        Self { entries, next_seq }
    }

    /// Appends a committed transaction, returning its sequence number.
    pub fn append(&mut self, txn: TxnId, mutations: Vec<WalMutation>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(WalEntry {
            seq,
            txn,
            mutations,
        });
        seq
    }

    /// Sequence number of the newest entry ever appended, 0 if none.
    pub fn last_seq(&self) -> u64 {
        self.next_seq.saturating_sub(1)
    }

    pub fn entries(&self) -> &[WalEntry] {
        &self.entries
    }

    /// Entries with a sequence number above `watermark`.
    pub fn entries_after(&self, watermark: u64) -> &[WalEntry] {
        let start = self.entries.partition_point(|e| e.seq <= watermark);
        &self.entries[start..]
    }

    /// Drops entries at or below `watermark`.
    pub fn trim_through(&mut self, watermark: u64) {
        let start = self.entries.partition_point(|e| e.seq <= watermark);
        self.entries.drain(..start);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest transaction id present in the log.
    pub fn max_txn(&self) -> TxnId {
        self.entries
            .iter()
            .map(|e| e.txn)
            .max()
            .unwrap_or(TxnId::NONE)
    }
}

impl Default for WalLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes `entries` into persisted WAL text.
pub fn encode_entries(entries: &[WalEntry]) -> CodecResult<String> {
    let mut payload = Vec::new();
    for entry in entries {
        entry.encode(&mut payload);
    }
    let mut bytes = Vec::with_capacity(payload.len() / 2 + 16);
    bytes.extend_from_slice(WAL_MAGIC);
    bytes.push(WAL_FORMAT_VERSION);
    bytes.extend_from_slice(&compress(&payload)?);
    Ok(transport::encode(&bytes))
}

/// Parses persisted WAL text. Entries must be in strictly increasing
/// sequence order.
pub fn decode_entries(text: &str, policy: ChecksumPolicy) -> WalResult<Vec<WalEntry>> {
    let bytes = transport::decode(text)?;
    if bytes.len() < WAL_MAGIC.len() + 1 || &bytes[..4] != WAL_MAGIC {
        return Err(WalError::BadMagic);
    }
    if bytes[4] != WAL_FORMAT_VERSION {
        return Err(WalError::UnsupportedVersion(bytes[4]));
    }

    let payload = decompress(&bytes[5..], policy)?;
    let mut reader = ByteReader::new(&payload);
    let mut entries: Vec<WalEntry> = Vec::new();
    while !reader.is_empty() {
        let mark = reader.u8("wal entry mark")?;
        if mark != ENTRY_MARK {
            return Err(CodecError::UnknownTag {
                tag: mark,
                context: "wal entry",
            }
            .into());
        }
        let entry = WalEntry::decode(&mut reader, entries.len())?;
        if let Some(previous) = entries.last() {
            if entry.seq <= previous.seq {
                return Err(WalError::OutOfOrder {
                    previous: previous.seq,
                    seq: entry.seq,
                });
            }
        }
        entries.push(entry);
    }
    Ok(entries)
}
