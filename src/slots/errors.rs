//! Slot store error types

use std::io;

use thiserror::Error;

/// Result type for slot operations
pub type SlotResult<T> = Result<T, SlotError>;

#[derive(Debug, Error)]
pub enum SlotError {
    /// The host caps string length per slot
    #[error("value for slot {name:?} is {len} bytes; the limit is {max}")]
    ValueTooLong { name: String, len: usize, max: usize },

    /// Slot names are restricted to ASCII letters, digits, '.', '_' and '-'
    #[error("invalid slot name {0:?}")]
    InvalidName(String),

    /// A chunk the metadata says exists is missing
    #[error("chunk slot {name:?} is missing")]
    MissingChunk { name: String },

    /// The host refused the operation
    #[error("slot {name:?} is unavailable")]
    Unavailable { name: String },

    #[error("I/O error on slot {name:?}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("slot store lock poisoned")]
    LockPoisoned,
}

impl SlotError {
    pub(crate) fn io(name: &str, source: io::Error) -> Self {
        SlotError::Io {
            name: name.to_string(),
            source,
        }
    }
}
