//! Directory-backed slot store
//!
//! One file per slot, `<dir>/<name>.slot`. A write goes to a temporary file
//! that is fsynced and renamed over the target, then the directory is
//! fsynced, so a slot always holds either its old or its new value.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::errors::{SlotError, SlotResult};
use super::{validate_name, SlotStore, DEFAULT_MAX_VALUE_LEN};

const SLOT_EXTENSION: &str = "slot";

#[derive(Debug, Clone)]
pub struct FileSlots {
    dir: PathBuf,
    max_value_len: usize,
}

impl FileSlots {
    /// Opens (creating if needed) a slot directory.
    pub fn open(dir: impl Into<PathBuf>) -> SlotResult<Self> {
        Self::with_max_value_len(dir, DEFAULT_MAX_VALUE_LEN)
    }

    pub fn with_max_value_len(dir: impl Into<PathBuf>, max_value_len: usize) -> SlotResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| SlotError::io(&dir.display().to_string(), e))?;
        Ok(Self { dir, max_value_len })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, SLOT_EXTENSION))
    }

    fn fsync_dir(&self) -> SlotResult<()> {
        // Directories cannot be opened for sync on every platform.
        if cfg!(unix) {
            let dir = OpenOptions::new()
                .read(true)
                .open(&self.dir)
                .map_err(|e| SlotError::io(&self.dir.display().to_string(), e))?;
            dir.sync_all()
                .map_err(|e| SlotError::io(&self.dir.display().to_string(), e))?;
        }
        Ok(())
    }
}

impl SlotStore for FileSlots {
    fn max_value_len(&self) -> usize {
        self.max_value_len
    }

    fn get(&self, name: &str) -> SlotResult<Option<String>> {
        validate_name(name)?;
        match fs::read_to_string(self.path_for(name)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SlotError::io(name, e)),
        }
    }

    fn set(&self, name: &str, value: &str) -> SlotResult<()> {
        validate_name(name)?;
        if value.len() > self.max_value_len {
            return Err(SlotError::ValueTooLong {
                name: name.to_string(),
                len: value.len(),
                max: self.max_value_len,
            });
        }

        let target = self.path_for(name);
        let tmp = target.with_extension(format!("{}.tmp", SLOT_EXTENSION));
        {
            let mut file = File::create(&tmp).map_err(|e| SlotError::io(name, e))?;
            file.write_all(value.as_bytes())
                .map_err(|e| SlotError::io(name, e))?;
            file.sync_all().map_err(|e| SlotError::io(name, e))?;
        }
        fs::rename(&tmp, &target).map_err(|e| SlotError::io(name, e))?;
        self.fsync_dir()
    }

    fn remove(&self, name: &str) -> SlotResult<()> {
        validate_name(name)?;
        match fs::remove_file(self.path_for(name)) {
            Ok(()) => self.fsync_dir(),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SlotError::io(name, e)),
        }
    }
}
