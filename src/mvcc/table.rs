//! Table handles
//!
//! A `Table<T>` is bound to one transaction and one row store. Writes are
//! pending until the transaction commits. Reads see the transaction's own
//! pending writes layered over committed rows.

use std::marker::PhantomData;
use std::sync::Arc;

use super::errors::TxnResult;
use super::row_store::{PendingVersion, RowStore};
use super::transaction::Transaction;
use crate::value::{Key, Storable};

pub struct Table<'t, T> {
    txn: &'t Transaction,
    store: Arc<RowStore>,
    _row: PhantomData<fn() -> T>,
}

impl<'t, T: Storable> Table<'t, T> {
    pub(crate) fn new(txn: &'t Transaction, store: Arc<RowStore>) -> Self {
        Self {
            txn,
            store,
            _row: PhantomData,
        }
    }

    pub fn id(&self) -> &str {
        self.store.table()
    }

    pub fn get(&self, key: impl Into<Key>) -> TxnResult<Option<T>> {
        let key = key.into();
        let value = match self.txn.own_write(self.id(), &key)? {
            Some(version) => version.as_row().cloned(),
            None => {
                let _gate = self.txn.shared().gate_read()?;
                self.store.get(&key)?
            }
        };
        Ok(value.map(T::from_value).transpose()?)
    }

    pub fn contains(&self, key: impl Into<Key>) -> TxnResult<bool> {
        let key = key.into();
        match self.txn.own_write(self.id(), &key)? {
            Some(version) => Ok(version.as_row().is_some()),
            None => {
                let _gate = self.txn.shared().gate_read()?;
                Ok(self.store.get(&key)?.is_some())
            }
        }
    }

    pub fn put(&self, key: impl Into<Key>, row: T) -> TxnResult<()> {
        self.txn.write(
            &self.store,
            key.into(),
            PendingVersion::Row(row.into_value()?),
        )
    }

    pub fn delete(&self, key: impl Into<Key>) -> TxnResult<()> {
        self.txn
            .write(&self.store, key.into(), PendingVersion::DeletionMark)
    }

    /// Every row this transaction sees, in key order.
    pub fn scan(&self) -> TxnResult<Vec<(Key, T)>> {
        self.txn.ensure_active()?;
        let _gate = self.txn.shared().gate_read()?;
        self.store
            .snapshot(self.txn.id())
            .map(|row| {
                let (key, value) = row?;
                Ok((key, T::from_value(value)?))
            })
            .collect()
    }
}

impl<T> std::fmt::Debug for Table<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("id", &self.store.table())
            .field("txn", &self.txn.id())
            .finish()
    }
}
