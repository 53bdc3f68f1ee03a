//! TxnId - transaction identity
//!
//! Issued by the database's [`TxnCounter`](super::TxnCounter) in strictly
//! increasing order. Ids are never reused within a process and stay below
//! [`MAX_TXN_ID`].

use std::fmt;

/// Largest id the counter will ever issue (2^53 - 1).
pub const MAX_TXN_ID: u64 = (1 << 53) - 1;

/// A transaction identity.
///
/// `TxnId::NONE` (zero) is never issued; it names the reader of a snapshot
/// that has no pending writes of its own.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TxnId(u64);

impl TxnId {
    pub const NONE: TxnId = TxnId(0);

    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_txn_id_ordering() {
        assert!(TxnId::new(1) < TxnId::new(2));
        assert!(TxnId::NONE < TxnId::new(1));
    }

    #[test]
    fn test_txn_id_display() {
        assert_eq!(TxnId::new(7).to_string(), "txn#7");
    }

    #[test]
    fn test_max_is_safe_integer_limit() {
        assert_eq!(MAX_TXN_ID, 9_007_199_254_740_991);
    }
}
