//! Persistence path
//!
//! Both writers follow the same discipline:
//!
//! 1. write the new text as chunks on the *inactive* side
//! 2. record the new descriptor and flip the side on a working copy of the
//!    metadata
//! 3. write the metadata blob; this is the commit point
//! 4. adopt the working copy
//!
//! A failure or crash before step 3 leaves the stored metadata pointing at
//! the previous sides, which were not touched. If step 3 itself fails, the
//! working copy is discarded, so the in-memory flip is reverted too.
//!
//! A snapshot save also rewrites the WAL: it captures the WAL watermark
//! under the commit gate before streaming rows, then stores the entries
//! newer than the watermark on the inactive WAL side and flips both sides
//! with one metadata write. Commits that land while rows are streaming may
//! or may not be in the snapshot; they are in the WAL either way, and
//! replaying full row values converges.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::errors::{DbError, DbResult};
use super::shared::Shared;
use crate::crash_point::points;
use crate::meta::{Metadata, PartsMeta, Side, WalMeta};
use crate::mvcc::TxnId;
use crate::slots::write_chunks;
use crate::snapshot::SnapshotWriter;
use crate::wal::encode_entries;

/// Outcome of one snapshot save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    /// Side that became active
    pub side: Side,
    pub tables: usize,
    pub rows: usize,
    pub chunks: u32,
    /// WAL entries newer than the snapshot, kept on the new WAL side
    pub wal_entries: usize,
    pub text_len: usize,
}

/// Outcome of one WAL flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    pub side: Side,
    pub entries: usize,
    pub chunks: u32,
    /// Highest sequence number now durable
    pub through_seq: u64,
}

impl Shared {
    /// Writes a full snapshot and folds the WAL into it.
    pub(crate) async fn save_snapshot(self: &Arc<Self>) -> DbResult<SaveReport> {
        let _persist = self.persist.lock().await;
        let shared = Arc::clone(self);
        let report = tokio::task::spawn_blocking(move || shared.save_snapshot_blocking())
            .await
            .map_err(|e| DbError::Task(e.to_string()))??;
        info!(
            side = %report.side,
            tables = report.tables,
            rows = report.rows,
            chunks = report.chunks,
            wal_entries = report.wal_entries,
            "snapshot saved"
        );
        Ok(report)
    }

    fn save_snapshot_blocking(&self) -> DbResult<SaveReport> {
        let watermark = {
            let _gate = self.gate_read()?;
            self.wal_lock()?.last_seq()
        };
        let mut next = self.meta_lock()?.clone();

        let mut writer = SnapshotWriter::new();
        for (id, store) in &self.tables {
            writer.table(id, store.snapshot(TxnId::NONE))?;
        }
        let (text, stats) = writer.finish()?;

        let parts_side = next.parts_side().other();
        let parts_chunks = write_chunks(
            self.slots.as_ref(),
            &self.names.parts(parts_side),
            &text,
            self.chunk_len,
            next.inactive_parts().chunks,
        )?;
        self.crash_points.check(points::SNAPSHOT_AFTER_PARTS_WRITE)?;
        *next.inactive_parts_mut() = PartsMeta {
            version: self.schema_version,
            chunks: parts_chunks,
        };

        let (entries, wal_through) = {
            let wal = self.wal_lock()?;
            let entries = wal.entries_after(watermark).to_vec();
            let through = entries.last().map_or(watermark, |e| e.seq);
            (entries, through)
        };
        let wal_text = encode_entries(&entries)?;
        let wal_chunks = write_chunks(
            self.slots.as_ref(),
            &self.names.wal(next.wal_side().other()),
            &wal_text,
            self.chunk_len,
            next.inactive_wal().chunks,
        )?;
        *next.inactive_wal_mut() = WalMeta {
            version: self.schema_version,
            chunks: wal_chunks,
        };

        next.switch_parts();
        next.switch_wal();
        next.raise_txn_high_water(self.counter.last_issued().value());
        self.crash_points.check(points::SNAPSHOT_BEFORE_META_WRITE)?;
        self.commit_metadata(next)?;

        self.wal_lock()?.trim_through(watermark);
        self.durable_seq.fetch_max(wal_through, Ordering::AcqRel);

        Ok(SaveReport {
            side: parts_side,
            tables: stats.tables,
            rows: stats.rows,
            chunks: parts_chunks,
            wal_entries: entries.len(),
            text_len: stats.text_len,
        })
    }

    /// Persists the WAL through at least `seq`.
    ///
    /// Concurrent callers queue on the persist lock; whoever gets it first
    /// writes every entry so far, and later callers find their entry durable.
    pub(crate) async fn flush_wal_through(self: &Arc<Self>, seq: u64) -> DbResult<()> {
        if self.is_durable(seq) {
            return Ok(());
        }
        let _persist = self.persist.lock().await;
        if self.is_durable(seq) {
            return Ok(());
        }
        let shared = Arc::clone(self);
        let report = tokio::task::spawn_blocking(move || shared.flush_wal_blocking())
            .await
            .map_err(|e| DbError::Task(e.to_string()))??;
        debug!(
            side = %report.side,
            entries = report.entries,
            chunks = report.chunks,
            through_seq = report.through_seq,
            "wal flushed"
        );
        Ok(())
    }

    fn flush_wal_blocking(&self) -> DbResult<FlushReport> {
        let (entries, through) = {
            let wal = self.wal_lock()?;
            (wal.entries().to_vec(), wal.last_seq())
        };
        let mut next = self.meta_lock()?.clone();

        let side = next.wal_side().other();
        let text = encode_entries(&entries)?;
        let chunks = write_chunks(
            self.slots.as_ref(),
            &self.names.wal(side),
            &text,
            self.chunk_len,
            next.inactive_wal().chunks,
        )?;
        self.crash_points.check(points::WAL_AFTER_SIDE_WRITE)?;

        *next.inactive_wal_mut() = WalMeta {
            version: self.schema_version,
            chunks,
        };
        next.switch_wal();
        next.raise_txn_high_water(self.counter.last_issued().value());
        self.crash_points.check(points::WAL_BEFORE_META_WRITE)?;
        self.commit_metadata(next)?;

        self.durable_seq.fetch_max(through, Ordering::AcqRel);
        Ok(FlushReport {
            side,
            entries: entries.len(),
            chunks,
            through_seq: through,
        })
    }

    /// Writes `next` to the metadata slot and adopts it on success.
    fn commit_metadata(&self, next: Metadata) -> DbResult<()> {
        if let Err(e) = self.slots.set(&self.names.meta(), &next.serialise()) {
            warn!(error = %e, "metadata write failed; keeping previous sides active");
            return Err(e.into());
        }
        *self.meta_lock()? = next;
        Ok(())
    }
}
