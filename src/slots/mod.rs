//! Host persistence primitive
//!
//! The store persists through named string slots of bounded length. Every
//! persisted structure is printable text, split across numbered slots when
//! it exceeds the limit.
//!
//! Slot names under a namespace `ns`:
//!
//! ```text
//! ns.meta                 root metadata
//! ns.parts.<a|b>.<i>      snapshot chunks per side
//! ns.wal.<a|b>.<i>        WAL chunks per side
//! ns.aux.<name>           auxiliary JSON blobs
//! ```

mod chunk;
mod errors;
mod file;
mod memory;

pub use chunk::{chunk_count, chunk_name, read_chunks, split_chunks, write_chunks};
pub use errors::{SlotError, SlotResult};
pub use file::FileSlots;
pub use memory::MemorySlots;

use crate::meta::Side;

/// Default per-slot string limit.
pub const DEFAULT_MAX_VALUE_LEN: usize = 32767;

/// Named, length-limited string storage.
pub trait SlotStore: Send + Sync {
    /// Longest value `set` accepts, in bytes.
    fn max_value_len(&self) -> usize;

    fn get(&self, name: &str) -> SlotResult<Option<String>>;

    /// Stores `value`, failing with `ValueTooLong` past `max_value_len`.
    fn set(&self, name: &str, value: &str) -> SlotResult<()>;

    /// Removes a slot. Removing a missing slot is not an error.
    fn remove(&self, name: &str) -> SlotResult<()>;
}

pub(crate) fn validate_name(name: &str) -> SlotResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));
    if valid {
        Ok(())
    } else {
        Err(SlotError::InvalidName(name.to_string()))
    }
}

/// Slot names for one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotNames {
    namespace: String,
}

impl SlotNames {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn meta(&self) -> String {
        format!("{}.meta", self.namespace)
    }

    /// Chunk prefix for snapshot parts on `side`.
    pub fn parts(&self, side: Side) -> String {
        format!("{}.parts.{}", self.namespace, side.label())
    }

    /// Chunk prefix for the WAL on `side`.
    pub fn wal(&self, side: Side) -> String {
        format!("{}.wal.{}", self.namespace, side.label())
    }

    pub fn aux(&self, name: &str) -> String {
        format!("{}.aux.{}", self.namespace, name)
    }
}
