//! Metadata error types

use thiserror::Error;

use crate::codec::CodecError;
use crate::schema::SchemaError;

/// Result type for metadata operations
pub type MetaResult<T> = Result<T, MetaError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetaError {
    #[error("metadata blob does not start with the META magic")]
    BadMagic,

    #[error("unsupported metadata format version {0}")]
    UnsupportedVersion(u8),

    #[error("metadata checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("invalid side tag {0}")]
    InvalidSide(u8),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
