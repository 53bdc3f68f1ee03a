//! Transaction id counter
//!
//! One counter per database instance. Allocation is a single atomic
//! compare-and-swap so ids stay unique when transactions begin from many
//! tasks. Running past [`MAX_TXN_ID`] is fatal for the instance: every
//! further `allocate` fails until the database is reopened.

use std::sync::atomic::{AtomicU64, Ordering};

use super::errors::{TxnError, TxnResult};
use super::txn_id::{TxnId, MAX_TXN_ID};

#[derive(Debug)]
pub struct TxnCounter {
    /// Next id to hand out.
    next: AtomicU64,
}

impl TxnCounter {
    /// Counter for a fresh database; the first id is 1.
    pub fn new() -> Self {
        Self::starting_after(TxnId::NONE)
    }

    /// Counter resuming after the highest id seen in persisted state.
    pub fn starting_after(last: TxnId) -> Self {
        Self {
            next: AtomicU64::new(last.value().saturating_add(1)),
        }
    }

    pub fn allocate(&self) -> TxnResult<TxnId> {
        self.next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| {
                (next <= MAX_TXN_ID).then_some(next + 1)
            })
            .map(TxnId::new)
            .map_err(|_| TxnError::Exhausted { limit: MAX_TXN_ID })
    }

    /// Highest id handed out so far, or `TxnId::NONE`.
    pub fn last_issued(&self) -> TxnId {
        let next = self.next.load(Ordering::Acquire);
        TxnId::new(next.saturating_sub(1).min(MAX_TXN_ID))
    }
}

impl Default for TxnCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_strictly_increasing() {
        let counter = TxnCounter::new();
        let a = counter.allocate().unwrap();
        let b = counter.allocate().unwrap();
        assert_eq!(a, TxnId::new(1));
        assert!(b > a);
        assert_eq!(counter.last_issued(), b);
    }

    #[test]
    fn test_resume_after_persisted_id() {
        let counter = TxnCounter::starting_after(TxnId::new(41));
        assert_eq!(counter.allocate().unwrap(), TxnId::new(42));
    }

    #[test]
    fn test_exhaustion_is_sticky() {
        let counter = TxnCounter::starting_after(TxnId::new(MAX_TXN_ID - 1));
        assert_eq!(counter.allocate().unwrap(), TxnId::new(MAX_TXN_ID));
        for _ in 0..3 {
            assert!(matches!(
                counter.allocate(),
                Err(TxnError::Exhausted { .. })
            ));
        }
        assert_eq!(counter.last_issued(), TxnId::new(MAX_TXN_ID));
    }

    #[test]
    fn test_concurrent_allocation_is_unique() {
        use std::collections::HashSet;
        use std::sync::Arc;

        let counter = Arc::new(TxnCounter::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    (0..250)
                        .map(|_| counter.allocate().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 1000);
    }
}
