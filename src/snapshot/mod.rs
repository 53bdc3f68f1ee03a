//! Snapshot codec
//!
//! A snapshot is every committed row of every table, streamed into one
//! self-describing byte sequence and carried as printable text:
//!
//! ```text
//! Header:  'SNAP' | 0x01                      (uncompressed)
//! Payload: LZ4 frame of records
//!   Table: 0x01 | varint(id length) | UTF-8 id   then its rows
//!   Row:   0x02 | varint(row length) | row bytes
//! ```
//!
//! There is no table or row count. A table's rows end at the next table
//! record or at the end of the stream.

mod errors;
mod reader;
mod writer;

pub use errors::{SnapshotError, SnapshotResult};
pub use reader::{read_snapshot, TableRows};
pub use writer::{SnapshotStats, SnapshotWriter};

const SNAPSHOT_MAGIC: &[u8; 4] = b"SNAP";
const SNAPSHOT_VERSION: u8 = 0x01;
const TABLE_MARK: u8 = 0x01;
const ROW_MARK: u8 = 0x02;
