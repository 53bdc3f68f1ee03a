//! Crash point injection for durability testing
//!
//! Named points sit between the steps of the persistence path. Two ways to
//! trigger one:
//!
//! - Process level: `SLOTDB_CRASH_POINT=<name>` makes the process abort at
//!   that point. No cleanup, no unwinding.
//! - In process: [`CrashPoints::arm`] on one database makes the next pass
//!   through the point fail with `DbError::InjectedCrash`, leaving every
//!   later step of that persist undone. Dropping the database afterwards is
//!   indistinguishable from a crash at that point.
//!
//! ```bash
//! SLOTDB_CRASH_POINT=snapshot_before_meta_write slotdb compact --dir ./data
//! ```

use std::sync::{Mutex, OnceLock};

use tracing::warn;

use crate::db::{DbError, DbResult};

static CRASH_POINT: OnceLock<Option<String>> = OnceLock::new();

#[inline]
fn env_crash_point() -> Option<&'static str> {
    CRASH_POINT
        .get_or_init(|| std::env::var("SLOTDB_CRASH_POINT").ok())
        .as_deref()
}

/// Returns true if `SLOTDB_CRASH_POINT` names `name`.
#[inline]
pub fn crash_point_enabled(name: &str) -> bool {
    env_crash_point() == Some(name)
}

/// Aborts the process if `SLOTDB_CRASH_POINT` names `name`.
#[inline]
pub fn maybe_crash(name: &str) {
    if crash_point_enabled(name) {
        eprintln!("[CRASH] Triggering crash at point: {}", name);
        std::process::abort();
    }
}

/// Per-database armed crash point.
#[derive(Debug, Default)]
pub struct CrashPoints {
    armed: Mutex<Option<&'static str>>,
}

impl CrashPoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `name`; it fires once.
    pub fn arm(&self, name: &'static str) {
        match self.armed.lock() {
            Ok(mut armed) => *armed = Some(name),
            Err(poisoned) => *poisoned.into_inner() = Some(name),
        }
    }

    pub fn disarm(&self) {
        match self.armed.lock() {
            Ok(mut armed) => *armed = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    /// Passes through point `name`.
    pub fn check(&self, name: &'static str) -> DbResult<()> {
        maybe_crash(name);
        let mut armed = self
            .armed
            .lock()
            .map_err(|_| DbError::LockPoisoned("crash points"))?;
        if *armed == Some(name) {
            *armed = None;
            warn!(point = name, "injected crash");
            return Err(DbError::InjectedCrash(name));
        }
        Ok(())
    }
}

/// All defined crash point names
pub mod points {
    /// Snapshot chunks written to the inactive parts side, nothing flipped
    pub const SNAPSHOT_AFTER_PARTS_WRITE: &str = "snapshot_after_parts_write";
    /// Parts and WAL sides written, metadata not yet persisted
    pub const SNAPSHOT_BEFORE_META_WRITE: &str = "snapshot_before_meta_write";
    /// WAL chunks written to the inactive WAL side, nothing flipped
    pub const WAL_AFTER_SIDE_WRITE: &str = "wal_after_side_write";
    /// WAL side written and flipped in memory, metadata not yet persisted
    pub const WAL_BEFORE_META_WRITE: &str = "wal_before_meta_write";

    pub const ALL: &[&str] = &[
        SNAPSHOT_AFTER_PARTS_WRITE,
        SNAPSHOT_BEFORE_META_WRITE,
        WAL_AFTER_SIDE_WRITE,
        WAL_BEFORE_META_WRITE,
    ];
}
