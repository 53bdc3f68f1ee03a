//! Save Coordinator Tests
//!
//! Tests for the background save loop:
//! - Bursts of save requests coalesce into few saves
//! - Commits in snapshot durability mode reach the slots through the loop
//! - WAL compaction is triggered once the WAL grows past its threshold,
//!   inline when no loop is running
//! - Shutdown stops the loop

use std::sync::Arc;
use std::time::Duration;

use slotdb::db::{Database, Durability, StoreConfig};
use slotdb::save::{SaveCoordinator, SaveStats};
use slotdb::schema::{Schema, SchemaRegistry};
use slotdb::slots::{MemorySlots, SlotStore};
use slotdb::value::Value;

fn registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry
        .version(1)
        .unwrap()
        .stores(Schema::new().table("players"))
        .unwrap();
    registry
}

async fn open(slots: &Arc<MemorySlots>, config: StoreConfig) -> Database {
    Database::open(Arc::clone(slots) as Arc<dyn SlotStore>, config, registry())
        .await
        .unwrap()
}

async fn put(db: &Database, key: i64) {
    let txn = db.begin().unwrap();
    txn.table::<Value>("players")
        .unwrap()
        .put(key, Value::from(key as f64))
        .unwrap();
    txn.commit().await.unwrap();
}

/// Polls until `check` holds or a second has passed.
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

// =============================================================================
// Coalescing Tests
// =============================================================================

/// A burst of requests never queues more than one follow-up save.
#[tokio::test]
async fn test_burst_of_requests_coalesces() {
    let slots = Arc::new(MemorySlots::new());
    let db = open(&slots, StoreConfig::default()).await;
    put(&db, 1).await;

    let coordinator = SaveCoordinator::spawn(db.clone());
    for _ in 0..100 {
        coordinator.schedule();
    }

    assert!(eventually(|| coordinator.stats().completed >= 1).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let stats = coordinator.shutdown().await.unwrap();
    assert!(
        (1..=2).contains(&stats.completed),
        "100 requests produced {} saves",
        stats.completed
    );
    assert_eq!(stats.failed, 0);
}

/// Requests spaced out by completed saves each get their own save.
#[tokio::test]
async fn test_spaced_requests_each_save() {
    let slots = Arc::new(MemorySlots::new());
    let db = open(&slots, StoreConfig::default()).await;
    let coordinator = SaveCoordinator::spawn(db.clone());

    for round in 1..=3u64 {
        coordinator.schedule();
        assert!(eventually(|| coordinator.stats().completed >= round).await);
    }

    let stats = coordinator.shutdown().await.unwrap();
    assert_eq!(stats, SaveStats { completed: 3, failed: 0 });
}

// =============================================================================
// Durability Mode Tests
// =============================================================================

/// In snapshot mode, commits become durable through the save loop.
#[tokio::test]
async fn test_snapshot_mode_commits_saved_by_loop() {
    let slots = Arc::new(MemorySlots::new());
    let config = StoreConfig::default().with_durability(Durability::Snapshot);
    let db = open(&slots, config.clone()).await;
    let coordinator = SaveCoordinator::spawn(db.clone());

    for key in 0..10 {
        put(&db, key).await;
    }
    assert!(eventually(|| db.wal_len().unwrap() == 0).await);
    coordinator.shutdown().await.unwrap();
    drop(db);

    let reopened = open(&slots, config).await;
    assert_eq!(reopened.read_table("players").unwrap().len(), 10);
}

/// In snapshot mode, a commit without a save is lost on reopen.
#[tokio::test]
async fn test_snapshot_mode_without_loop_is_not_durable() {
    let slots = Arc::new(MemorySlots::new());
    let config = StoreConfig::default().with_durability(Durability::Snapshot);
    let db = open(&slots, config.clone()).await;
    put(&db, 1).await;
    assert_eq!(db.wal_len().unwrap(), 1);
    drop(db);

    let reopened = open(&slots, config).await;
    assert!(reopened.read_table("players").unwrap().is_empty());
}

/// A WAL past the compaction threshold is folded into a snapshot.
#[tokio::test]
async fn test_wal_compaction_requested() {
    let slots = Arc::new(MemorySlots::new());
    let config = StoreConfig::default().with_wal_compact_after(4);
    let db = open(&slots, config).await;
    let coordinator = SaveCoordinator::spawn(db.clone());

    for key in 0..4 {
        put(&db, key).await;
    }
    assert!(eventually(|| coordinator.stats().completed >= 1).await);
    assert!(eventually(|| db.wal_len().unwrap() == 0).await);
    assert!(db.metadata().unwrap().active_parts().chunks > 0);

    coordinator.shutdown().await.unwrap();
}

/// Without a save loop, the commit reaching the threshold compacts inline.
#[tokio::test]
async fn test_wal_compacted_inline_without_loop() {
    let slots = Arc::new(MemorySlots::new());
    let config = StoreConfig::default().with_wal_compact_after(4);
    let db = open(&slots, config.clone()).await;

    for key in 0..3 {
        put(&db, key).await;
    }
    assert_eq!(db.wal_len().unwrap(), 3);
    assert_eq!(db.metadata().unwrap().active_parts().chunks, 0);

    put(&db, 3).await;
    assert_eq!(db.wal_len().unwrap(), 0);
    assert!(db.metadata().unwrap().active_parts().chunks > 0);
    drop(db);

    let reopened = open(&slots, config).await;
    assert_eq!(reopened.read_table("players").unwrap().len(), 4);
    assert_eq!(reopened.wal_len().unwrap(), 0);
}

/// Once the loop shuts down, threshold compaction falls back to inline.
#[tokio::test]
async fn test_inline_compaction_after_shutdown() {
    let slots = Arc::new(MemorySlots::new());
    let config = StoreConfig::default().with_wal_compact_after(2);
    let db = open(&slots, config).await;
    SaveCoordinator::spawn(db.clone()).shutdown().await.unwrap();

    put(&db, 1).await;
    put(&db, 2).await;
    assert_eq!(db.wal_len().unwrap(), 0);
}

// =============================================================================
// Shutdown Tests
// =============================================================================

/// After shutdown, requests no longer produce saves.
#[tokio::test]
async fn test_shutdown_stops_loop() {
    let slots = Arc::new(MemorySlots::new());
    let db = open(&slots, StoreConfig::default()).await;
    let coordinator = SaveCoordinator::spawn(db.clone());
    let stats = coordinator.shutdown().await.unwrap();
    assert_eq!(stats, SaveStats::default());

    db.request_save();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(db.metadata().unwrap().active_parts().chunks, 0);
}
