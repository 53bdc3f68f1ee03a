//! In-process slot store
//!
//! Shared through an `Arc`, so the slots outlive any `Database` opened on
//! them; dropping a database without saving is how tests simulate a crash.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, RwLock};

use super::errors::{SlotError, SlotResult};
use super::{validate_name, SlotStore, DEFAULT_MAX_VALUE_LEN};

#[derive(Debug)]
pub struct MemorySlots {
    max_value_len: usize,
    slots: RwLock<BTreeMap<String, String>>,
    failing: Mutex<BTreeSet<String>>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::with_max_value_len(DEFAULT_MAX_VALUE_LEN)
    }

    pub fn with_max_value_len(max_value_len: usize) -> Self {
        Self {
            max_value_len,
            slots: RwLock::new(BTreeMap::new()),
            failing: Mutex::new(BTreeSet::new()),
        }
    }

    /// Makes every later `set` of `name` fail with `Unavailable`.
    pub fn fail_writes_to(&self, name: impl Into<String>) -> SlotResult<()> {
        self.failing
            .lock()
            .map_err(|_| SlotError::LockPoisoned)?
            .insert(name.into());
        Ok(())
    }

    pub fn clear_failures(&self) -> SlotResult<()> {
        self.failing
            .lock()
            .map_err(|_| SlotError::LockPoisoned)?
            .clear();
        Ok(())
    }

    /// Names of every slot holding a value.
    pub fn names(&self) -> SlotResult<Vec<String>> {
        Ok(self
            .slots
            .read()
            .map_err(|_| SlotError::LockPoisoned)?
            .keys()
            .cloned()
            .collect())
    }
}

impl Default for MemorySlots {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotStore for MemorySlots {
    fn max_value_len(&self) -> usize {
        self.max_value_len
    }

    fn get(&self, name: &str) -> SlotResult<Option<String>> {
        validate_name(name)?;
        Ok(self
            .slots
            .read()
            .map_err(|_| SlotError::LockPoisoned)?
            .get(name)
            .cloned())
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
        if self
            .failing
            .lock()
            .map_err(|_| SlotError::LockPoisoned)?
            .contains(name)
        {
            return Err(SlotError::Unavailable {
                name: name.to_string(),
            });
        }
        self.slots
            .write()
            .map_err(|_| SlotError::LockPoisoned)?
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, name: &str) -> SlotResult<()> {
        validate_name(name)?;
        self.slots
            .write()
            .map_err(|_| SlotError::LockPoisoned)?
            .remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let slots = MemorySlots::new();
        assert_eq!(slots.get("db.meta").unwrap(), None);
        slots.set("db.meta", "hello").unwrap();
        assert_eq!(slots.get("db.meta").unwrap().as_deref(), Some("hello"));
        slots.remove("db.meta").unwrap();
        assert_eq!(slots.get("db.meta").unwrap(), None);
    }

    #[test]
    fn test_value_length_limit() {
        let slots = MemorySlots::with_max_value_len(4);
        slots.set("a", "1234").unwrap();
        assert!(matches!(
            slots.set("a", "12345"),
            Err(SlotError::ValueTooLong { len: 5, max: 4, .. })
        ));
        assert_eq!(slots.get("a").unwrap().as_deref(), Some("1234"));
    }

    #[test]
    fn test_injected_failure() {
        let slots = MemorySlots::new();
        slots.fail_writes_to("db.meta").unwrap();
        assert!(matches!(
            slots.set("db.meta", "x"),
            Err(SlotError::Unavailable { .. })
        ));
        slots.clear_failures().unwrap();
        slots.set("db.meta", "x").unwrap();
    }

    #[test]
    fn test_invalid_name() {
        let slots = MemorySlots::new();
        assert!(matches!(
            slots.set("../escape", "x"),
            Err(SlotError::InvalidName(_))
        ));
    }
}
