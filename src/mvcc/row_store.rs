//! Per-table row store
//!
//! A store keeps two maps:
//!
//! - `committed`: key -> currently visible payload, ordered by key
//! - `pending`: (txn, key) -> the version an open transaction wrote
//!
//! Transactions register versions with `row_updated` and later either
//! `settle` them into `committed` or `revoke` them. Nothing else mutates a
//! store, except `load_row_unchecked`/`apply_unchecked` while the database
//! is being restored and no transaction exists yet.
//!
//! # Snapshot consistency
//!
//! [`RowStore::snapshot`] is lazy and takes the store lock once per row, not
//! for the whole walk. Rows settled while a snapshot is being consumed may
//! or may not appear in it. The result is a best-effort view of the latest
//! committed state, not a point-in-time view pinned to a transaction.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::errors::{TxnError, TxnResult};
use super::txn_id::TxnId;
use crate::value::{Key, Value};

/// A version written by an open transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingVersion {
    Row(Value),
    /// The key is absent once this version settles.
    DeletionMark,
}

impl PendingVersion {
    pub fn as_row(&self) -> Option<&Value> {
        match self {
            PendingVersion::Row(value) => Some(value),
            PendingVersion::DeletionMark => None,
        }
    }
}

impl From<Option<Value>> for PendingVersion {
    fn from(value: Option<Value>) -> Self {
        value.map_or(PendingVersion::DeletionMark, PendingVersion::Row)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    committed: BTreeMap<Key, Value>,
    pending: BTreeMap<(TxnId, Key), PendingVersion>,
}

#[derive(Debug)]
pub struct RowStore {
    table: Arc<str>,
    state: RwLock<StoreState>,
}

impl RowStore {
    pub fn new(table: impl Into<Arc<str>>) -> Self {
        Self {
            table: table.into(),
            state: RwLock::new(StoreState::default()),
        }
    }

    pub fn table(&self) -> &Arc<str> {
        &self.table
    }

    fn read(&self) -> TxnResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| TxnError::LockPoisoned("row store"))
    }

    fn write(&self) -> TxnResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| TxnError::LockPoisoned("row store"))
    }

    /// Registers `txn`'s version of `key`, replacing (and so revoking) any
    /// version the same transaction registered before.
    pub fn row_updated(&self, txn: TxnId, key: Key, version: PendingVersion) -> TxnResult<()> {
        let mut state = self.write()?;
        state.pending.insert((txn, key), version);
        Ok(())
    }

    /// Discards `txn`'s pending version of `key`, if any.
    ///
    /// Never touches the committed map. Returns whether a version existed.
    pub fn revoke(&self, txn: TxnId, key: &Key) -> TxnResult<bool> {
        let mut state = self.write()?;
        Ok(state.pending.remove(&(txn, key.clone())).is_some())
    }

    /// Promotes `txn`'s pending version of `key` into the committed map.
    ///
    /// Returns the settled version, or `None` if there was nothing pending.
    pub fn settle(&self, txn: TxnId, key: &Key) -> TxnResult<Option<PendingVersion>> {
        let mut state = self.write()?;
        let Some(version) = state.pending.remove(&(txn, key.clone())) else {
            return Ok(None);
        };
        match &version {
            PendingVersion::Row(value) => {
                state.committed.insert(key.clone(), value.clone());
            }
            PendingVersion::DeletionMark => {
                state.committed.remove(key);
            }
        }
        Ok(Some(version))
    }

    /// Committed payload for `key`.
    pub fn get(&self, key: &Key) -> TxnResult<Option<Value>> {
        Ok(self.read()?.committed.get(key).cloned())
    }

    /// Payload for `key` as `reader` sees it: its own pending version if it
    /// wrote one, the committed payload otherwise.
    pub fn get_as(&self, reader: TxnId, key: &Key) -> TxnResult<Option<Value>> {
        let state = self.read()?;
        match state.pending.get(&(reader, key.clone())) {
            Some(version) => Ok(version.as_row().cloned()),
            None => Ok(state.committed.get(key).cloned()),
        }
    }

    /// Lazy, restartable walk of the rows `reader` sees, in key order.
    ///
    /// Pass `TxnId::NONE` for committed rows only.
    pub fn snapshot(self: &Arc<Self>, reader: TxnId) -> RowSnapshot {
        RowSnapshot {
            store: Arc::clone(self),
            reader,
            cursor: None,
            done: false,
        }
    }

    /// Bulk-loads a committed row during restore.
    pub fn load_row_unchecked(&self, key: Key, value: Value) -> TxnResult<()> {
        self.write()?.committed.insert(key, value);
        Ok(())
    }

    /// Applies a replayed committed version during restore.
    pub fn apply_unchecked(&self, key: Key, version: PendingVersion) -> TxnResult<()> {
        let mut state = self.write()?;
        match version {
            PendingVersion::Row(value) => {
                state.committed.insert(key, value);
            }
            PendingVersion::DeletionMark => {
                state.committed.remove(&key);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> TxnResult<usize> {
        Ok(self.read()?.committed.len())
    }

    pub fn is_empty(&self) -> TxnResult<bool> {
        Ok(self.read()?.committed.is_empty())
    }

    /// Number of pending versions across all transactions.
    pub fn pending_len(&self) -> TxnResult<usize> {
        Ok(self.read()?.pending.len())
    }
}

/// Cursor over a [`RowStore`]; see the module docs for its consistency.
#[derive(Debug, Clone)]
pub struct RowSnapshot {
    store: Arc<RowStore>,
    reader: TxnId,
    cursor: Option<Key>,
    done: bool,
}

impl RowSnapshot {
    pub fn table(&self) -> &Arc<str> {
        self.store.table()
    }

    /// Starts the walk over from the first key.
    pub fn rewind(&mut self) {
        self.cursor = None;
        self.done = false;
    }

    fn step(&mut self) -> TxnResult<Option<(Key, Value)>> {
        let state = self.store.read()?;
        loop {
            let (lower, own_lower) = match &self.cursor {
                Some(key) => (
                    Bound::Excluded(key.clone()),
                    Bound::Excluded((self.reader, key.clone())),
                ),
                None => (
                    Bound::Unbounded,
                    Bound::Included((self.reader, Key::new(Vec::new()))),
                ),
            };
            let committed = state.committed.range((lower, Bound::Unbounded)).next();
            let own = state
                .pending
                .range((own_lower, Bound::Unbounded))
                .next()
                .filter(|((txn, _), _)| *txn == self.reader);

            // The reader's own version shadows a committed row with the same key.
            let (key, value) = match (committed, own) {
                (None, None) => return Ok(None),
                (Some((ck, cv)), Some(((_, ok), ov))) => {
                    if ok <= ck {
                        (ok, ov.as_row())
                    } else {
                        (ck, Some(cv))
                    }
                }
                (Some((ck, cv)), None) => (ck, Some(cv)),
                (None, Some(((_, ok), ov))) => (ok, ov.as_row()),
            };
            self.cursor = Some(key.clone());
            if let Some(value) = value {
                return Ok(Some((key.clone(), value.clone())));
            }
        }
    }
}

impl Iterator for RowSnapshot {
    type Item = TxnResult<(Key, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
