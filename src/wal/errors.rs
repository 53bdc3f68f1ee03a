//! WAL error types
//!
//! Every WAL error met while loading is corruption of persisted state.

use thiserror::Error;

use crate::codec::CodecError;

/// Result type for WAL operations
pub type WalResult<T> = Result<T, WalError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalError {
    #[error("WAL text does not start with the WLOG magic")]
    BadMagic,

    #[error("unsupported WAL format version {0}")]
    UnsupportedVersion(u8),

    #[error("WAL entry {index} checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        index: usize,
        stored: u32,
        computed: u32,
    },

    #[error("WAL entries out of order: {seq} follows {previous}")]
    OutOfOrder { previous: u64, seq: u64 },

    #[error(transparent)]
    Codec(#[from] CodecError),
}
