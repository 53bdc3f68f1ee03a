//! Transaction error types

use std::fmt;

use thiserror::Error;

use super::txn_id::TxnId;
use crate::value::ConversionError;

/// Result type for transaction and row-store operations
pub type TxnResult<T> = Result<T, TxnError>;

/// Lifecycle state of a transaction. Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnStatus {
    Ongoing,
    Committed,
    Aborted,
}

impl fmt::Display for TxnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxnStatus::Ongoing => "ongoing",
            TxnStatus::Committed => "committed",
            TxnStatus::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TxnError {
    /// The id counter reached its limit. The instance must be reopened.
    #[error("transaction ids exhausted at {limit}; reopen the database")]
    Exhausted { limit: u64 },

    /// Write, commit or abort through a transaction that already ended
    #[error("{id} is already {status}")]
    Terminated { id: TxnId, status: TxnStatus },

    #[error("table {0:?} is not declared in the current schema")]
    UnknownTable(String),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),
}
