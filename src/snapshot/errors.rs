//! Snapshot codec error types

use thiserror::Error;

use crate::codec::CodecError;
use crate::mvcc::TxnError;
use crate::schema::SchemaError;

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    #[error("snapshot text does not start with the SNAP magic")]
    BadMagic,

    #[error("unsupported snapshot format version {0}")]
    UnsupportedVersion(u8),

    /// A table record names a table the schema does not declare
    #[error(transparent)]
    UnknownTable(#[from] SchemaError),

    #[error("row record at offset {offset} precedes any table record")]
    RowOutsideTable { offset: usize },

    #[error("table {0:?} appears twice in one snapshot")]
    DuplicateTable(String),

    /// Reading rows from a live store failed while writing
    #[error(transparent)]
    Source(#[from] TxnError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
