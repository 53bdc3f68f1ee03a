//! Chunking and Schema Version Tests
//!
//! Tests for persisted layout:
//! - Text longer than a slot splits into ceil(len / max) chunks
//! - Chunks reassemble byte-for-byte in index order
//! - Stale chunks past the new count are removed
//! - Schema versions are immutable once declared
//! - Schema history evolves across reopen

use std::sync::Arc;

use rand::Rng;

use slotdb::db::{Database, DbError, StoreConfig};
use slotdb::meta::Metadata;
use slotdb::schema::{Schema, SchemaError, SchemaRegistry};
use slotdb::slots::{
    chunk_count, read_chunks, split_chunks, write_chunks, MemorySlots, SlotNames, SlotStore,
};
use slotdb::value::{Key, Value};

const SLOT_LEN: usize = 256;

fn registry_v1() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry
        .version(1)
        .unwrap()
        .stores(Schema::new().table("players").table("chests"))
        .unwrap();
    registry
}

async fn open_with(
    slots: &Arc<MemorySlots>,
    config: StoreConfig,
    registry: SchemaRegistry,
) -> Result<Database, DbError> {
    Database::open(Arc::clone(slots) as Arc<dyn SlotStore>, config, registry).await
}

/// Commits `count` rows of incompressible payload in one transaction.
async fn fill(db: &Database, count: i64) {
    let mut rng = rand::thread_rng();
    let txn = db.begin().unwrap();
    let chests = txn.table::<Value>("chests").unwrap();
    for i in 0..count {
        let payload: Vec<u8> = (0..48).map(|_| rng.gen()).collect();
        chests.put(i, Value::Bytes(payload)).unwrap();
    }
    txn.commit().await.unwrap();
}

fn chunk_indices(slots: &MemorySlots, prefix: &str) -> Vec<u32> {
    let prefix = format!("{}.", prefix);
    let mut indices: Vec<u32> = slots
        .names()
        .unwrap()
        .iter()
        .filter_map(|name| name.strip_prefix(&prefix)?.parse().ok())
        .collect();
    indices.sort_unstable();
    indices
}

// =============================================================================
// Chunk Split Tests
// =============================================================================

/// Split pieces respect the limit and concatenate back to the input.
#[test]
fn test_split_and_reassemble() {
    let slots = MemorySlots::with_max_value_len(10);
    let text: String = (0..95).map(|i| char::from(b'!' + (i % 90) as u8)).collect();

    let count = write_chunks(&slots, "t.parts.a", &text, 10, 0).unwrap();
    assert_eq!(count as usize, chunk_count(text.len(), 10));
    assert_eq!(count, 10);
    assert_eq!(split_chunks(&text, 10).len(), 10);
    assert_eq!(read_chunks(&slots, "t.parts.a", count).unwrap(), text);
}

/// A missing chunk is reported, never silently skipped.
#[test]
fn test_missing_chunk_reported() {
    let slots = MemorySlots::new();
    write_chunks(&slots, "t.wal.b", &"x".repeat(30), 10, 0).unwrap();
    slots.remove("t.wal.b.1").unwrap();
    let err = read_chunks(&slots, "t.wal.b", 3).unwrap_err();
    assert_eq!(
        DbError::from(err).code(),
        "SLOTDB_SLOT_MISSING_CHUNK"
    );
}

/// A saved snapshot takes exactly ceil(len / max) slots.
#[tokio::test]
async fn test_snapshot_chunk_count() {
    let slots = Arc::new(MemorySlots::with_max_value_len(SLOT_LEN));
    let db = open_with(&slots, StoreConfig::default(), registry_v1())
        .await
        .unwrap();
    fill(&db, 60).await;

    let report = db.save_snapshot().await.unwrap();
    assert!(report.text_len > SLOT_LEN);
    assert_eq!(report.chunks as usize, chunk_count(report.text_len, SLOT_LEN));

    let prefix = SlotNames::new("slotdb").parts(report.side);
    let expected: Vec<u32> = (0..report.chunks).collect();
    assert_eq!(chunk_indices(&slots, &prefix), expected);
}

/// The configured chunk bound applies when it is below the slot limit.
#[tokio::test]
async fn test_configured_chunk_len_caps_chunks() {
    let slots = Arc::new(MemorySlots::with_max_value_len(SLOT_LEN));
    let config = StoreConfig::default().with_max_chunk_len(100);
    let db = open_with(&slots, config, registry_v1()).await.unwrap();
    fill(&db, 20).await;

    let report = db.save_snapshot().await.unwrap();
    assert_eq!(report.chunks as usize, chunk_count(report.text_len, 100));
}

/// Rows chunked across many slots reload intact.
#[tokio::test]
async fn test_chunked_snapshot_reloads() {
    let slots = Arc::new(MemorySlots::with_max_value_len(SLOT_LEN));
    let db = open_with(&slots, StoreConfig::default(), registry_v1())
        .await
        .unwrap();
    fill(&db, 80).await;
    db.save_snapshot().await.unwrap();
    let expected = db.read_table("chests").unwrap();
    drop(db);

    let reopened = open_with(&slots, StoreConfig::default(), registry_v1())
        .await
        .unwrap();
    assert_eq!(reopened.read_table("chests").unwrap(), expected);
}

/// Shrinking a side's snapshot removes the chunks past the new count.
#[tokio::test]
async fn test_stale_chunks_removed() {
    let slots = Arc::new(MemorySlots::with_max_value_len(SLOT_LEN));
    let db = open_with(&slots, StoreConfig::default(), registry_v1())
        .await
        .unwrap();
    fill(&db, 80).await;
    let large = db.save_snapshot().await.unwrap();

    let txn = db.begin().unwrap();
    let chests = txn.table::<Value>("chests").unwrap();
    for i in 1..80i64 {
        chests.delete(i).unwrap();
    }
    txn.commit().await.unwrap();

    // Two saves land on the side the large snapshot used.
    db.save_snapshot().await.unwrap();
    let small = db.save_snapshot().await.unwrap();
    assert_eq!(small.side, large.side);
    assert!(small.chunks < large.chunks);

    let prefix = SlotNames::new("slotdb").parts(small.side);
    let expected: Vec<u32> = (0..small.chunks).collect();
    assert_eq!(chunk_indices(&slots, &prefix), expected);
    assert_eq!(
        db.read_table("chests").unwrap().into_iter().map(|(k, _)| k).collect::<Vec<_>>(),
        vec![Key::from(0i64)]
    );
}

// =============================================================================
// Schema Version Tests
// =============================================================================

/// version(n) fails every time after the first declaration.
#[test]
fn test_version_declared_once() {
    let mut meta = Metadata::new();
    meta.version(1)
        .unwrap()
        .stores(Schema::new().table("players"))
        .unwrap();

    for _ in 0..2 {
        assert_eq!(
            meta.version(1).err(),
            Some(SchemaError::DuplicateVersion(1))
        );
    }
    assert!(meta.version(2).is_ok());
}

/// Metadata with a schema history survives serialisation.
#[test]
fn test_metadata_serialise_roundtrip() {
    let mut meta = Metadata::new();
    meta.version(1)
        .unwrap()
        .stores(Schema::new().table("players"))
        .unwrap();
    meta.switch_parts();
    let text = meta.serialise();
    assert_eq!(Metadata::deserialise(&text).unwrap(), meta);
}

/// A new version drops removed tables and starts added ones empty.
#[tokio::test]
async fn test_schema_evolution_across_reopen() {
    let slots = Arc::new(MemorySlots::new());
    let db = open_with(&slots, StoreConfig::default(), registry_v1())
        .await
        .unwrap();
    let txn = db.begin().unwrap();
    txn.table::<Value>("players")
        .unwrap()
        .put("p1", Value::from("alex"))
        .unwrap();
    txn.table::<Value>("chests")
        .unwrap()
        .put(1i64, Value::from("loot"))
        .unwrap();
    txn.commit().await.unwrap();
    db.save_snapshot().await.unwrap();
    drop(db);

    let mut registry = registry_v1();
    registry
        .version(2)
        .unwrap()
        .stores(Schema::new().table("players").table("villagers"))
        .unwrap();
    let db = open_with(&slots, StoreConfig::default(), registry)
        .await
        .unwrap();

    assert_eq!(db.schema_version(), 2);
    assert_eq!(db.table_ids().collect::<Vec<_>>(), vec!["players", "villagers"]);
    assert_eq!(db.read_table("players").unwrap().len(), 1);
    assert!(db.read_table("villagers").unwrap().is_empty());
    assert_eq!(db.metadata().unwrap().active_parts().version, 1);

    let report = db.save_snapshot().await.unwrap();
    assert_eq!(report.tables, 2);
    assert_eq!(db.metadata().unwrap().active_parts().version, 2);
}

/// A declared schema that contradicts the stored one is rejected at open.
#[tokio::test]
async fn test_conflicting_schema_rejected() {
    let slots = Arc::new(MemorySlots::new());
    open_with(&slots, StoreConfig::default(), registry_v1())
        .await
        .unwrap()
        .save_snapshot()
        .await
        .unwrap();

    let mut changed = SchemaRegistry::new();
    changed
        .version(1)
        .unwrap()
        .stores(Schema::new().table("players"))
        .unwrap();
    let err = open_with(&slots, StoreConfig::default(), changed)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Schema(SchemaError::Conflict(1))));
}
