//! Transaction lifecycle
//!
//! A transaction is created Ongoing by [`Database::begin`] and ends exactly
//! once, in `commit` or `abort`. Every write is registered as a pending
//! version in the owning row store and recorded here, so the end of the
//! transaction can settle or revoke precisely the keys it touched.
//!
//! # Isolation
//!
//! Read committed with no row-level locking. Two transactions that write
//! the same key can both commit; the later settle wins. The settle loop runs
//! under the database's commit gate held exclusively, and readers take the
//! gate shared, so no reader observes a half-settled commit.
//!
//! [`Database::begin`]: crate::db::Database::begin

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use super::errors::{TxnError, TxnResult, TxnStatus};
use super::row_store::{PendingVersion, RowStore};
use super::table::Table;
use super::txn_id::TxnId;
use crate::db::{DbResult, Shared};
use crate::value::{Key, Storable};
use crate::wal::WalMutation;

type WriteSet = BTreeMap<Arc<str>, BTreeMap<Key, PendingVersion>>;

#[derive(Debug)]
struct TxnState {
    status: TxnStatus,
    writes: WriteSet,
}

pub struct Transaction {
    shared: Arc<Shared>,
    id: TxnId,
    state: Mutex<TxnState>,
}

impl Transaction {
    /// Allocates an id and registers with the database.
    pub(crate) fn begin(shared: Arc<Shared>) -> TxnResult<Self> {
        let id = shared.counter.allocate()?;
        shared.register(id)?;
        debug!(txn = id.value(), "transaction started");
        Ok(Self {
            shared,
            id,
            state: Mutex::new(TxnState {
                status: TxnStatus::Ongoing,
                writes: BTreeMap::new(),
            }),
        })
    }

    pub fn id(&self) -> TxnId {
        self.id
    }

    pub fn status(&self) -> TxnResult<TxnStatus> {
        Ok(self.lock_state()?.status)
    }

    fn lock_state(&self) -> TxnResult<MutexGuard<'_, TxnState>> {
        self.state
            .lock()
            .map_err(|_| TxnError::LockPoisoned("transaction state"))
    }

    fn ensure_ongoing(&self, state: &TxnState) -> TxnResult<()> {
        match state.status {
            TxnStatus::Ongoing => Ok(()),
            status => Err(TxnError::Terminated {
                id: self.id,
                status,
            }),
        }
    }

    /// Handle on table `id`, bound to this transaction.
    pub fn table<T: Storable>(&self, id: &str) -> TxnResult<Table<'_, T>> {
        self.ensure_ongoing(&*self.lock_state()?)?;
        let store = self
            .shared
            .table_store(id)
            .ok_or_else(|| TxnError::UnknownTable(id.to_string()))?;
        Ok(Table::new(self, store))
    }

    /// Records a write of `key` in `store`.
    ///
    /// A second write to the same key replaces the first, both here and in
    /// the row store's pending versions.
    pub(crate) fn write(
        &self,
        store: &RowStore,
        key: Key,
        version: PendingVersion,
    ) -> TxnResult<()> {
        let mut state = self.lock_state()?;
        self.ensure_ongoing(&state)?;
        let table_writes = state.writes.entry(Arc::clone(store.table())).or_default();
        if table_writes.contains_key(&key) {
            store.revoke(self.id, &key)?;
        }
        store.row_updated(self.id, key.clone(), version.clone())?;
        table_writes.insert(key, version);
        Ok(())
    }

    /// This transaction's own pending version of `key`, if it wrote one.
    pub(crate) fn own_write(&self, table: &str, key: &Key) -> TxnResult<Option<PendingVersion>> {
        let state = self.lock_state()?;
        self.ensure_ongoing(&state)?;
        Ok(state
            .writes
            .get(table)
            .and_then(|keys| keys.get(key))
            .cloned())
    }

    pub(crate) fn ensure_active(&self) -> TxnResult<()> {
        self.ensure_ongoing(&*self.lock_state()?)
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }

    /// Moves the transaction to `status`, handing back what it wrote.
    fn finish(&self, status: TxnStatus) -> TxnResult<WriteSet> {
        let mut state = self.lock_state()?;
        self.ensure_ongoing(&state)?;
        state.status = status;
        Ok(std::mem::take(&mut state.writes))
    }

    /// Number of keys written so far.
    pub fn write_count(&self) -> TxnResult<usize> {
        Ok(self.lock_state()?.writes.values().map(BTreeMap::len).sum())
    }

    /// Settles every touched key and appends the commit to the WAL.
    ///
    /// Changes become visible to other transactions once this returns. With
    /// `durability = "wal"` the WAL is flushed before returning; an error
    /// from that flush means the commit is visible but not yet durable.
    pub async fn commit(&self) -> DbResult<()> {
        let writes = self.finish(TxnStatus::Committed)?;
        let seq = self.settle_all(&writes);
        self.shared.unregister(self.id)?;
        let seq = seq?;

        debug!(
            txn = self.id.value(),
            keys = writes.values().map(BTreeMap::len).sum::<usize>(),
            "transaction committed"
        );

        match seq {
            Some(seq) => self.shared.after_commit(seq).await,
            None => Ok(()),
        }
    }

    /// Applies the write set under the commit gate. Returns the WAL
    /// sequence number of the commit, or `None` if nothing was written.
    fn settle_all(&self, writes: &WriteSet) -> TxnResult<Option<u64>> {
        if writes.is_empty() {
            return Ok(None);
        }
        let _gate = self.shared.gate_write()?;
        let mut mutations = Vec::new();
        for (table, keys) in writes {
            let Some(store) = self.shared.table_store(table) else {
                continue;
            };
            for key in keys.keys() {
                if let Some(version) = store.settle(self.id, key)? {
                    mutations.push(WalMutation {
                        table: Arc::clone(table),
                        key: key.clone(),
                        version,
                    });
                }
            }
        }
        let seq = self.shared.append_wal(self.id, mutations)?;
        Ok(Some(seq))
    }

    /// Revokes every touched key.
    pub async fn abort(&self) -> DbResult<()> {
        let writes = self.finish(TxnStatus::Aborted)?;
        let revoked = self.revoke_all(&writes);
        self.shared.unregister(self.id)?;
        revoked?;
        debug!(txn = self.id.value(), "transaction aborted");
        Ok(())
    }

    fn revoke_all(&self, writes: &WriteSet) -> TxnResult<()> {
        for (table, keys) in writes {
            if let Some(store) = self.shared.table_store(table) {
                for key in keys.keys() {
                    store.revoke(self.id, key)?;
                }
            }
        }
        Ok(())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        let writes = match self.state.get_mut() {
            Ok(state) if state.status == TxnStatus::Ongoing => {
                state.status = TxnStatus::Aborted;
                std::mem::take(&mut state.writes)
            }
            _ => return,
        };
        warn!(
            txn = self.id.value(),
            keys = writes.values().map(BTreeMap::len).sum::<usize>(),
            "transaction dropped while ongoing; revoking its writes"
        );
        if let Err(e) = self.revoke_all(&writes) {
            warn!(txn = self.id.value(), error = %e, "failed to revoke dropped transaction");
        }
        if let Err(e) = self.shared.unregister(self.id) {
            warn!(txn = self.id.value(), error = %e, "failed to unregister dropped transaction");
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction").field("id", &self.id).finish()
    }
}
