//! Database handle
//!
//! [`Database`] ties the subsystems together:
//!
//! - open: verify metadata, merge schema versions, restore the active
//!   snapshot, replay the active WAL
//! - transactions: [`Database::begin`] hands out [`Transaction`]s that share
//!   the row stores and the commit gate
//! - persistence: snapshot saves and WAL flushes, both written to the
//!   inactive side and committed by one metadata write
//!
//! The handle is cheap to clone; every clone refers to the same state.
//!
//! Durability depends on [`Durability`] and on whether a
//! [`SaveCoordinator`](crate::save::SaveCoordinator) is running:
//!
//! - `Wal`: a commit returns once its WAL entry is persisted. When the WAL
//!   reaches `wal_compact_after` entries the commit hands compaction to the
//!   save loop, or saves a snapshot itself when no loop is attached.
//! - `Snapshot`: commits only request a save. Without a running save loop
//!   nothing is persisted until [`Database::save_snapshot`] is called.
//!
//! ```no_run
//! # async fn demo() -> slotdb::db::DbResult<()> {
//! use std::sync::Arc;
//! use slotdb::db::{Database, StoreConfig};
//! use slotdb::schema::{Schema, SchemaRegistry};
//! use slotdb::slots::MemorySlots;
//! use slotdb::value::Value;
//!
//! let mut schema = SchemaRegistry::new();
//! schema.version(1)?.stores(Schema::new().table("players"))?;
//!
//! let db = Database::open(Arc::new(MemorySlots::new()), StoreConfig::default(), schema).await?;
//! let txn = db.begin()?;
//! txn.table::<Value>("players")?.put("steve", Value::from(20.0))?;
//! txn.commit().await?;
//! # Ok(())
//! # }
//! ```

mod blobs;
mod config;
mod errors;
mod persist;
mod recovery;
mod shared;

pub use config::{Durability, StoreConfig};
pub use errors::{DbError, DbResult, ErrorClass};
pub use persist::{FlushReport, SaveReport};
pub(crate) use shared::Shared;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::meta::Metadata;
use crate::mvcc::{Transaction, TxnId};
use crate::schema::SchemaRegistry;
use crate::slots::SlotStore;
use crate::value::{Key, Value};

#[derive(Clone)]
pub struct Database {
    shared: Arc<Shared>,
}

impl Database {
    /// Opens the database stored in `slots`, creating it if the metadata
    /// slot is empty.
    ///
    /// `schema` holds the versions declared by the application. They are
    /// merged into the persisted history; an empty registry adopts whatever
    /// is stored.
    pub async fn open(
        slots: Arc<dyn SlotStore>,
        config: StoreConfig,
        schema: SchemaRegistry,
    ) -> DbResult<Self> {
        let parts = tokio::task::spawn_blocking(move || recovery::recover(slots, config, &schema))
            .await
            .map_err(|e| DbError::Task(e.to_string()))??;
        Ok(Self {
            shared: Arc::new(Shared::new(parts)),
        })
    }

    /// Starts a transaction.
    pub fn begin(&self) -> DbResult<Transaction> {
        Ok(Transaction::begin(Arc::clone(&self.shared))?)
    }

    /// Copy of the in-memory metadata, as last committed.
    pub fn metadata(&self) -> DbResult<Metadata> {
        Ok(self.shared.meta_lock()?.clone())
    }

    /// Schema version new snapshots are written with.
    pub fn schema_version(&self) -> u32 {
        self.shared.schema_version
    }

    pub fn table_ids(&self) -> impl Iterator<Item = &str> {
        self.shared.tables.keys().map(|id| &**id)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    /// Committed rows of one table in key order, outside any transaction.
    pub fn read_table(&self, id: &str) -> DbResult<Vec<(Key, Value)>> {
        let store = self
            .shared
            .table_store(id)
            .ok_or_else(|| crate::mvcc::TxnError::UnknownTable(id.to_string()))?;
        let _gate = self.shared.gate_read()?;
        let rows = store
            .snapshot(TxnId::NONE)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Writes a full snapshot now, waiting for any save in progress first.
    pub async fn save_snapshot(&self) -> DbResult<SaveReport> {
        self.shared.save_snapshot().await
    }

    /// Persists every WAL entry appended so far.
    pub async fn flush_wal(&self) -> DbResult<()> {
        let last = self.shared.wal_lock()?.last_seq();
        self.shared.flush_wal_through(last).await
    }

    /// Asks the save coordinator, if one runs, for a snapshot save.
    pub fn request_save(&self) {
        self.shared.request_save();
    }

    /// Number of committed transactions not yet folded into a snapshot.
    pub fn wal_len(&self) -> DbResult<usize> {
        Ok(self.shared.wal_lock()?.len())
    }

    /// Ids of transactions that have begun and not yet ended.
    pub fn live_transactions(&self) -> DbResult<Vec<TxnId>> {
        Ok(self.shared.live_transactions()?)
    }

    /// Arms a crash point for the next persist on this database.
    ///
    /// See [`crate::crash_point::points`] for the names.
    pub fn arm_crash_point(&self, name: &'static str) {
        self.shared.crash_points.arm(name);
    }

    /// Reads an auxiliary JSON blob, falling back to the default when the
    /// slot is empty or does not parse.
    pub fn load_aux<T>(&self, name: &str) -> DbResult<T>
    where
        T: DeserializeOwned + Default,
    {
        self.shared.load_aux(name)
    }

    pub fn store_aux<T: Serialize>(&self, name: &str, value: &T) -> DbResult<()> {
        self.shared.store_aux(name, value)
    }

    pub fn remove_aux(&self, name: &str) -> DbResult<()> {
        self.shared.remove_aux(name)
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("namespace", &self.shared.config.namespace)
            .field("schema_version", &self.shared.schema_version)
            .field("tables", &self.shared.tables.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::slots::MemorySlots;
    use serde::Deserialize;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .version(1)
            .unwrap()
            .stores(Schema::new().table("players").table("chests"))
            .unwrap();
        registry
    }

    async fn open(slots: &Arc<MemorySlots>) -> Database {
        Database::open(
            Arc::clone(slots) as Arc<dyn SlotStore>,
            StoreConfig::default(),
            registry(),
        )
        .await
        .unwrap()
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        volume: u8,
        name: String,
    }

    #[tokio::test]
    async fn test_open_fresh_database() {
        let slots = Arc::new(MemorySlots::new());
        let db = open(&slots).await;
        assert_eq!(db.schema_version(), 1);
        assert_eq!(db.table_ids().collect::<Vec<_>>(), vec!["chests", "players"]);
        assert_eq!(db.wal_len().unwrap(), 0);
        assert!(db.read_table("players").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_survives_reopen_through_wal() {
        let slots = Arc::new(MemorySlots::new());
        {
            let db = open(&slots).await;
            let txn = db.begin().unwrap();
            txn.table::<Value>("players")
                .unwrap()
                .put("alex", Value::Number(7.0))
                .unwrap();
            txn.commit().await.unwrap();
            assert_eq!(db.wal_len().unwrap(), 1);
        }
        let db = open(&slots).await;
        assert_eq!(
            db.read_table("players").unwrap(),
            vec![(Key::from("alex"), Value::Number(7.0))]
        );
    }

    #[tokio::test]
    async fn test_ids_resume_after_reopen() {
        let slots = Arc::new(MemorySlots::new());
        let last = {
            let db = open(&slots).await;
            let txn = db.begin().unwrap();
            txn.table::<Value>("players")
                .unwrap()
                .put("a", Value::Null)
                .unwrap();
            txn.commit().await.unwrap();
            txn.id()
        };
        let db = open(&slots).await;
        assert!(db.begin().unwrap().id() > last);
    }

    #[tokio::test]
    async fn test_read_table_unknown() {
        let slots = Arc::new(MemorySlots::new());
        let db = open(&slots).await;
        assert!(matches!(
            db.read_table("nether"),
            Err(DbError::Txn(crate::mvcc::TxnError::UnknownTable(_)))
        ));
    }

    #[tokio::test]
    async fn test_aux_blob_roundtrip() {
        let slots = Arc::new(MemorySlots::new());
        let db = open(&slots).await;
        assert_eq!(db.load_aux::<Prefs>("prefs").unwrap(), Prefs::default());

        let prefs = Prefs {
            volume: 80,
            name: "steve".to_string(),
        };
        db.store_aux("prefs", &prefs).unwrap();
        assert_eq!(db.load_aux::<Prefs>("prefs").unwrap(), prefs);

        db.remove_aux("prefs").unwrap();
        assert_eq!(db.load_aux::<Prefs>("prefs").unwrap(), Prefs::default());
    }

    #[tokio::test]
    async fn test_corrupt_aux_blob_resets_to_default() {
        let slots = Arc::new(MemorySlots::new());
        slots.set("slotdb.aux.prefs", "{not json").unwrap();
        let db = open(&slots).await;
        assert_eq!(db.load_aux::<Prefs>("prefs").unwrap(), Prefs::default());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_at_open() {
        let slots = Arc::new(MemorySlots::new());
        let result = Database::open(
            slots as Arc<dyn SlotStore>,
            StoreConfig::default().with_max_chunk_len(0),
            registry(),
        )
        .await;
        assert!(matches!(result, Err(DbError::Config(_))));
    }
}
