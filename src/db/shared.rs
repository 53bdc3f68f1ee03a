//! State shared by a database handle, its transactions and the save loop

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::Notify;
use tracing::{debug, warn};

use super::config::{Durability, StoreConfig};
use super::errors::{DbError, DbResult};
use crate::crash_point::CrashPoints;
use crate::meta::Metadata;
use crate::mvcc::{RowStore, TxnCounter, TxnError, TxnId, TxnResult};
use crate::slots::{SlotNames, SlotStore};
use crate::wal::{WalLog, WalMutation};

pub(crate) struct Shared {
    pub(crate) config: StoreConfig,
    pub(crate) slots: Arc<dyn SlotStore>,
    pub(crate) names: SlotNames,
    /// Effective chunk length: the configured bound capped by the store
    pub(crate) chunk_len: usize,
    /// Latest declared schema version; new snapshots are written with it
    pub(crate) schema_version: u32,
    pub(crate) tables: BTreeMap<Arc<str>, Arc<RowStore>>,
    pub(crate) counter: TxnCounter,
    live: Mutex<BTreeSet<TxnId>>,
    /// Held exclusively while a commit settles, shared by readers
    commit_gate: RwLock<()>,
    wal: Mutex<WalLog>,
    /// Highest WAL sequence number known to be persisted
    pub(crate) durable_seq: AtomicU64,
    meta: Mutex<Metadata>,
    /// Serializes every write to the slot store
    pub(crate) persist: tokio::sync::Mutex<()>,
    pub(crate) save_signal: Notify,
    /// Number of running save loops listening on `save_signal`
    save_loops: AtomicUsize,
    pub(crate) crash_points: CrashPoints,
}

pub(crate) struct SharedParts {
    pub(crate) config: StoreConfig,
    pub(crate) slots: Arc<dyn SlotStore>,
    pub(crate) meta: Metadata,
    pub(crate) schema_version: u32,
    pub(crate) tables: BTreeMap<Arc<str>, Arc<RowStore>>,
    pub(crate) wal: WalLog,
    pub(crate) counter: TxnCounter,
}

impl Shared {
    pub(crate) fn new(parts: SharedParts) -> Self {
        let chunk_len = parts
            .config
            .max_chunk_len
            .min(parts.slots.max_value_len());
        let durable_seq = parts.wal.last_seq();
        Self {
            names: SlotNames::new(parts.config.namespace.clone()),
            config: parts.config,
            slots: parts.slots,
            chunk_len,
            schema_version: parts.schema_version,
            tables: parts.tables,
            counter: parts.counter,
            live: Mutex::new(BTreeSet::new()),
            commit_gate: RwLock::new(()),
            wal: Mutex::new(parts.wal),
            durable_seq: AtomicU64::new(durable_seq),
            meta: Mutex::new(parts.meta),
            persist: tokio::sync::Mutex::new(()),
            save_signal: Notify::new(),
            save_loops: AtomicUsize::new(0),
            crash_points: CrashPoints::new(),
        }
    }

    pub(crate) fn table_store(&self, id: &str) -> Option<Arc<RowStore>> {
        self.tables.get(id).cloned()
    }

    pub(crate) fn register(&self, id: TxnId) -> TxnResult<()> {
        self.live
            .lock()
            .map_err(|_| TxnError::LockPoisoned("transaction registry"))?
            .insert(id);
        Ok(())
    }

    pub(crate) fn unregister(&self, id: TxnId) -> TxnResult<()> {
        self.live
            .lock()
            .map_err(|_| TxnError::LockPoisoned("transaction registry"))?
            .remove(&id);
        Ok(())
    }

    pub(crate) fn live_transactions(&self) -> TxnResult<Vec<TxnId>> {
        Ok(self
            .live
            .lock()
            .map_err(|_| TxnError::LockPoisoned("transaction registry"))?
            .iter()
            .copied()
            .collect())
    }

    pub(crate) fn gate_read(&self) -> TxnResult<RwLockReadGuard<'_, ()>> {
        self.commit_gate
            .read()
            .map_err(|_| TxnError::LockPoisoned("commit gate"))
    }

    pub(crate) fn gate_write(&self) -> TxnResult<RwLockWriteGuard<'_, ()>> {
        self.commit_gate
            .write()
            .map_err(|_| TxnError::LockPoisoned("commit gate"))
    }

    pub(crate) fn wal_lock(&self) -> TxnResult<MutexGuard<'_, WalLog>> {
        self.wal
            .lock()
            .map_err(|_| TxnError::LockPoisoned("write-ahead log"))
    }

    pub(crate) fn meta_lock(&self) -> DbResult<MutexGuard<'_, Metadata>> {
        self.meta
            .lock()
            .map_err(|_| DbError::LockPoisoned("metadata"))
    }

    /// Appends a commit to the in-memory WAL. Called under the commit gate
    /// so WAL order matches settle order.
    pub(crate) fn append_wal(&self, txn: TxnId, mutations: Vec<WalMutation>) -> TxnResult<u64> {
        Ok(self.wal_lock()?.append(txn, mutations))
    }

    /// Durability and compaction follow-up once a commit has settled.
    ///
    /// A WAL at its compaction threshold is handed to the save loop when one
    /// is attached and folded into a snapshot inline otherwise. The commit
    /// is already durable at that point, so an inline save failure is only
    /// logged.
    pub(crate) async fn after_commit(self: &Arc<Self>, seq: u64) -> DbResult<()> {
        match self.config.durability {
            Durability::Wal => {
                self.flush_wal_through(seq).await?;
                let wal_len = self.wal_lock()?.len();
                if wal_len < self.config.wal_compact_after {
                    return Ok(());
                }
                if self.has_save_loop() {
                    self.request_save();
                } else {
                    debug!(wal_len, "compacting write-ahead log inline");
                    if let Err(e) = self.save_snapshot().await {
                        warn!(code = e.code(), error = %e, "inline compaction failed");
                    }
                }
            }
            Durability::Snapshot => self.request_save(),
        }
        Ok(())
    }

    pub(crate) fn attach_save_loop(&self) {
        self.save_loops.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn detach_save_loop(&self) {
        self.save_loops.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn has_save_loop(&self) -> bool {
        self.save_loops.load(Ordering::Acquire) > 0
    }

    /// Wakes the save coordinator. Requests made while one is already
    /// pending collapse into it.
    pub(crate) fn request_save(&self) {
        self.save_signal.notify_one();
    }

    pub(crate) fn is_durable(&self, seq: u64) -> bool {
        self.durable_seq.load(Ordering::Acquire) >= seq
    }
}
