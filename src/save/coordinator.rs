//! Coalescing save loop
//!
//! The loop waits on the database's save signal. The signal holds at most
//! one pending wake-up, so requests raised while a save is running collapse
//! into a single follow-up save. A failed save is logged and counted; the
//! loop does not retry it and waits for the next request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::db::{Database, DbError, DbResult, SaveReport};

#[derive(Debug, Default)]
struct Counters {
    completed: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> SaveStats {
        SaveStats {
            completed: self.completed.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
        }
    }
}

/// Save loop counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SaveStats {
    pub completed: u64,
    pub failed: u64,
}

pub struct SaveCoordinator {
    db: Database,
    counters: Arc<Counters>,
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl SaveCoordinator {
    /// Starts the save loop for `db` on the current tokio runtime.
    pub fn spawn(db: Database) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let counters = Arc::new(Counters::default());
        db.shared().attach_save_loop();
        let handle = Self::spawn_loop(db.clone(), Arc::clone(&counters), shutdown_tx.subscribe());
        Self {
            db,
            counters,
            shutdown_tx,
            handle,
        }
    }

    fn spawn_loop(
        db: Database,
        counters: Arc<Counters>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let shared = Arc::clone(db.shared());
            let mut run_id = 0u64;

            loop {
                tokio::select! {
                    _ = shared.save_signal.notified() => {
                        run_id += 1;
                        debug!(run_id, "save requested");
                        match db.save_snapshot().await {
                            Ok(_) => {
                                counters.completed.fetch_add(1, Ordering::AcqRel);
                            }
                            Err(e) => {
                                counters.failed.fetch_add(1, Ordering::AcqRel);
                                error!(run_id, code = e.code(), error = %e, "save failed");
                            }
                        }
                    }

                    _ = shutdown_rx.recv() => {
                        info!(saves = run_id, "save coordinator shutting down");
                        break;
                    }
                }
            }
            shared.detach_save_loop();
        })
    }

    /// Requests a save. Returns immediately; requests made before the loop
    /// gets to them collapse into one save.
    pub fn schedule(&self) {
        self.db.request_save();
    }

    /// Saves now and waits for the result. Runs after any save already in
    /// progress.
    pub async fn save(&self) -> DbResult<SaveReport> {
        self.db.save_snapshot().await
    }

    pub fn stats(&self) -> SaveStats {
        self.counters.snapshot()
    }

    /// Stops the loop, letting a save in progress finish first.
    pub async fn shutdown(self) -> DbResult<SaveStats> {
        let Self {
            counters,
            shutdown_tx,
            handle,
            ..
        } = self;
        shutdown_tx.send(()).ok();
        handle
            .await
            .map_err(|e| DbError::Task(format!("save loop join error: {}", e)))?;
        Ok(counters.snapshot())
    }
}
