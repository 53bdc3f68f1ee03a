//! Top-level error type
//!
//! Wraps every subsystem error. Each error carries a stable code string and
//! a class:
//!
//! - `Fatal`: the instance cannot continue (id exhaustion, poisoned locks)
//! - `Programmer`: misuse raised synchronously, never retried
//! - `Corruption`: persisted state failed to parse or verify
//! - `Transient`: the host refused or failed an operation; a later save may
//!   succeed

use std::fmt;

use thiserror::Error;

use crate::codec::CodecError;
use crate::meta::MetaError;
use crate::mvcc::TxnError;
use crate::schema::SchemaError;
use crate::slots::SlotError;
use crate::snapshot::SnapshotError;
use crate::wal::WalError;

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Fatal,
    Programmer,
    Corruption,
    Transient,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Fatal => write!(f, "FATAL"),
            ErrorClass::Programmer => write!(f, "PROGRAMMER"),
            ErrorClass::Corruption => write!(f, "CORRUPTION"),
            ErrorClass::Transient => write!(f, "TRANSIENT"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Txn(#[from] TxnError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("metadata: {0}")]
    Meta(#[from] MetaError),

    #[error("snapshot: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("wal: {0}")]
    Wal(#[from] WalError),

    #[error(transparent)]
    Slot(#[from] SlotError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("auxiliary blob {name:?}: {message}")]
    Aux { name: String, message: String },

    /// An armed crash point fired
    #[error("injected crash at {0}")]
    InjectedCrash(&'static str),

    /// A blocking persistence task panicked or was cancelled
    #[error("persistence task failed: {0}")]
    Task(String),

    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

impl DbError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        DbError::Config(message.into())
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            DbError::Txn(e) => match e {
                TxnError::Exhausted { .. } => "SLOTDB_TXN_EXHAUSTED",
                TxnError::Terminated { .. } => "SLOTDB_TXN_TERMINATED",
                TxnError::UnknownTable(_) => "SLOTDB_UNKNOWN_TABLE",
                TxnError::Conversion(_) => "SLOTDB_CONVERSION",
                TxnError::LockPoisoned(_) => "SLOTDB_LOCK_POISONED",
            },
            DbError::Schema(e) => match e {
                SchemaError::DuplicateVersion(_) => "SLOTDB_SCHEMA_DUPLICATE_VERSION",
                SchemaError::SchemaAlreadyAttached(_) => "SLOTDB_SCHEMA_ALREADY_ATTACHED",
                SchemaError::Conflict(_) => "SLOTDB_SCHEMA_CONFLICT",
                SchemaError::UnknownTable { .. } => "SLOTDB_UNKNOWN_TABLE",
                SchemaError::UnknownVersion(_)
                | SchemaError::MissingSchema(_)
                | SchemaError::NoVersions => "SLOTDB_SCHEMA_MISSING",
            },
            DbError::Meta(_) => "SLOTDB_META_CORRUPT",
            DbError::Snapshot(SnapshotError::UnknownTable(_)) => "SLOTDB_SNAPSHOT_UNKNOWN_TABLE",
            DbError::Snapshot(SnapshotError::Source(_)) => "SLOTDB_SNAPSHOT_SOURCE",
            DbError::Snapshot(_) => "SLOTDB_SNAPSHOT_CORRUPT",
            DbError::Wal(_) => "SLOTDB_WAL_CORRUPT",
            DbError::Slot(e) => match e {
                SlotError::ValueTooLong { .. } => "SLOTDB_SLOT_VALUE_TOO_LONG",
                SlotError::InvalidName(_) => "SLOTDB_SLOT_INVALID_NAME",
                SlotError::MissingChunk { .. } => "SLOTDB_SLOT_MISSING_CHUNK",
                SlotError::Unavailable { .. } | SlotError::Io { .. } => "SLOTDB_SLOT_IO",
                SlotError::LockPoisoned => "SLOTDB_LOCK_POISONED",
            },
            DbError::Codec(_) => "SLOTDB_FORMAT",
            DbError::Config(_) => "SLOTDB_CONFIG",
            DbError::Aux { .. } => "SLOTDB_AUX",
            DbError::InjectedCrash(_) => "SLOTDB_INJECTED_CRASH",
            DbError::Task(_) => "SLOTDB_TASK_FAILED",
            DbError::LockPoisoned(_) => "SLOTDB_LOCK_POISONED",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            DbError::Txn(TxnError::Exhausted { .. }) | DbError::Txn(TxnError::LockPoisoned(_)) => {
                ErrorClass::Fatal
            }
            DbError::Txn(_) => ErrorClass::Programmer,
            DbError::Schema(SchemaError::UnknownVersion(_))
            | DbError::Schema(SchemaError::MissingSchema(_)) => ErrorClass::Corruption,
            DbError::Schema(_) => ErrorClass::Programmer,
            DbError::Snapshot(SnapshotError::Source(TxnError::LockPoisoned(_))) => {
                ErrorClass::Fatal
            }
            DbError::Meta(_) | DbError::Snapshot(_) | DbError::Wal(_) | DbError::Codec(_) => {
                ErrorClass::Corruption
            }
            DbError::Slot(SlotError::MissingChunk { .. }) => ErrorClass::Corruption,
            DbError::Slot(SlotError::ValueTooLong { .. })
            | DbError::Slot(SlotError::InvalidName(_)) => ErrorClass::Programmer,
            DbError::Slot(SlotError::LockPoisoned) => ErrorClass::Fatal,
            DbError::Slot(_) => ErrorClass::Transient,
            DbError::Config(_) => ErrorClass::Programmer,
            DbError::Aux { .. } => ErrorClass::Transient,
            DbError::InjectedCrash(_) | DbError::Task(_) | DbError::LockPoisoned(_) => {
                ErrorClass::Fatal
            }
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mvcc::{TxnId, TxnStatus};

    #[test]
    fn test_exhaustion_is_fatal() {
        let err = DbError::from(TxnError::Exhausted { limit: 1 });
        assert_eq!(err.code(), "SLOTDB_TXN_EXHAUSTED");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_terminated_is_programmer_error() {
        let err = DbError::from(TxnError::Terminated {
            id: TxnId::new(3),
            status: TxnStatus::Committed,
        });
        assert_eq!(err.class(), ErrorClass::Programmer);
        assert_eq!(err.to_string(), "txn#3 is already committed");
    }

    #[test]
    fn test_duplicate_version_is_programmer_error() {
        let err = DbError::from(SchemaError::DuplicateVersion(2));
        assert_eq!(err.code(), "SLOTDB_SCHEMA_DUPLICATE_VERSION");
        assert_eq!(err.class(), ErrorClass::Programmer);
    }

    #[test]
    fn test_format_errors_are_corruption() {
        assert_eq!(
            DbError::from(MetaError::BadMagic).class(),
            ErrorClass::Corruption
        );
        assert_eq!(
            DbError::from(CodecError::VarintOverflow).class(),
            ErrorClass::Corruption
        );
        assert_eq!(
            DbError::from(SnapshotError::BadMagic).code(),
            "SLOTDB_SNAPSHOT_CORRUPT"
        );
    }

    #[test]
    fn test_slot_unavailable_is_transient() {
        let err = DbError::from(SlotError::Unavailable {
            name: "db.meta".to_string(),
        });
        assert_eq!(err.class(), ErrorClass::Transient);
        assert_eq!(err.code(), "SLOTDB_SLOT_IO");
    }
}
