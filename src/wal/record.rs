//! WAL entry types and their binary form
//!
//! Each committed transaction becomes one entry:
//!
//! ```text
//! 0x03 | varint(body length) | body | CRC32(body) (u32 LE)
//!
//! body:     seq (u64 LE) | txn id (u64 LE) | varint(mutation count) | mutation*
//! mutation: table id (varint length + UTF-8)
//!           | 0x02 | varint(row length) | row bytes     (put)
//!           | 0x04 | varint(key length) | key bytes     (delete)
//! ```
//!
//! Entries carry full row values, so replaying an entry over any state that
//! already contains earlier entries converges on the same result.

use std::sync::Arc;

use super::errors::{WalError, WalResult};
use crate::codec::{compute_checksum, put_bytes, put_str, put_varint, ByteReader, CodecError};
use crate::mvcc::{PendingVersion, TxnId};
use crate::value::{decode_key, decode_row, encode_key, encode_row, Key};

pub(crate) const ENTRY_MARK: u8 = 0x03;
const PUT_MARK: u8 = 0x02;
const DELETE_MARK: u8 = 0x04;

/// One settled write.
#[derive(Debug, Clone, PartialEq)]
pub struct WalMutation {
    pub table: Arc<str>,
    pub key: Key,
    pub version: PendingVersion,
}

/// One committed transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct WalEntry {
    pub seq: u64,
    pub txn: TxnId,
    pub mutations: Vec<WalMutation>,
}

impl WalEntry {
    /// Appends the framed entry to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        let mut body = Vec::with_capacity(32);
        body.extend_from_slice(&self.seq.to_le_bytes());
        body.extend_from_slice(&self.txn.value().to_le_bytes());
        put_varint(&mut body, self.mutations.len() as u32);
        for mutation in &self.mutations {
            put_str(&mut body, &mutation.table);
            match &mutation.version {
                PendingVersion::Row(value) => {
                    body.push(PUT_MARK);
                    put_bytes(&mut body, &encode_row(&mutation.key, value));
                }
                PendingVersion::DeletionMark => {
                    body.push(DELETE_MARK);
                    put_bytes(&mut body, &encode_key(&mutation.key));
                }
            }
        }

        buf.push(ENTRY_MARK);
        put_bytes(buf, &body);
        buf.extend_from_slice(&compute_checksum(&body).to_le_bytes());
    }

    /// Reads one framed entry; the entry mark has already been consumed.
    pub fn decode(reader: &mut ByteReader<'_>, index: usize) -> WalResult<Self> {
        let body = reader.bytes("wal entry body")?;
        let stored = reader.u32_le("wal entry checksum")?;
        let computed = compute_checksum(body);
        if stored != computed {
            return Err(WalError::ChecksumMismatch {
                index,
                stored,
                computed,
            });
        }

        let mut body = ByteReader::new(body);
        let seq = body.u64_le("wal seq")?;
        let txn = TxnId::new(body.u64_le("wal txn id")?);
        let count = body.varint("wal mutation count")?;
        let mut mutations = Vec::with_capacity(count.min(1024) as usize);
        for _ in 0..count {
            let table: Arc<str> = Arc::from(body.str("wal table id")?);
            let (key, version) = match body.u8("wal mutation mark")? {
                PUT_MARK => {
                    let (key, value) = decode_row(body.bytes("wal row")?)?;
                    (key, PendingVersion::Row(value))
                }
                DELETE_MARK => (
                    decode_key(body.bytes("wal key")?)?,
                    PendingVersion::DeletionMark,
                ),
                tag => {
                    return Err(CodecError::UnknownTag {
                        tag,
                        context: "wal mutation",
                    }
                    .into())
                }
            };
            mutations.push(WalMutation {
                table,
                key,
                version,
            });
        }
        body.finish()?;

        Ok(Self {
            seq,
            txn,
            mutations,
        })
    }
}
