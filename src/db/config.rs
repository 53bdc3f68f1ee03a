//! Store configuration
//!
//! Loaded from a JSON file; every field has a default, so `{}` is a valid
//! configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{DbError, DbResult};
use crate::codec::ChecksumPolicy;
use crate::slots::DEFAULT_MAX_VALUE_LEN;

/// When a commit becomes durable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Durability {
    /// `commit()` returns after the WAL holding it is persisted.
    #[default]
    Wal,
    /// Commits persist with the next snapshot save; each commit requests one.
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Prefix of every slot name (default "slotdb")
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Upper bound on one chunk; the slot store's own limit also applies
    #[serde(default = "default_max_chunk_len")]
    pub max_chunk_len: usize,

    #[serde(default)]
    pub durability: Durability,

    /// WAL length at which a commit requests a snapshot save
    #[serde(default = "default_wal_compact_after")]
    pub wal_compact_after: usize,

    /// Content checksum mismatch handling when decompressing
    #[serde(default)]
    pub checksum_policy: ChecksumPolicy,
}

fn default_namespace() -> String {
    "slotdb".to_string()
}
fn default_max_chunk_len() -> usize {
    DEFAULT_MAX_VALUE_LEN
}
fn default_wal_compact_after() -> usize {
    64
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            max_chunk_len: default_max_chunk_len(),
            durability: Durability::default(),
            wal_compact_after: default_wal_compact_after(),
            checksum_policy: ChecksumPolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> DbResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| DbError::config(format!("failed to read config: {}", e)))?;

        let config: StoreConfig = serde_json::from_str(&content)
            .map_err(|e| DbError::config(format!("invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> DbResult<()> {
        let namespace_ok = !self.namespace.is_empty()
            && self
                .namespace
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-'));
        if !namespace_ok {
            return Err(DbError::config(format!(
                "invalid namespace '{}': use ASCII letters, digits, '_' or '-'",
                self.namespace
            )));
        }

        if self.max_chunk_len == 0 {
            return Err(DbError::config("max_chunk_len must be > 0"));
        }

        if self.wal_compact_after == 0 {
            return Err(DbError::config("wal_compact_after must be > 0"));
        }

        Ok(())
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_max_chunk_len(mut self, max_chunk_len: usize) -> Self {
        self.max_chunk_len = max_chunk_len;
        self
    }

    pub fn with_durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    pub fn with_wal_compact_after(mut self, entries: usize) -> Self {
        self.wal_compact_after = entries;
        self
    }

    pub fn with_checksum_policy(mut self, policy: ChecksumPolicy) -> Self {
        self.checksum_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, value: serde_json::Value) -> std::path::PathBuf {
        let path = dir.path().join("slotdb.json");
        fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[test]
    fn test_config_defaults() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::load(&write_config(&dir, json!({}))).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.namespace, "slotdb");
        assert_eq!(config.max_chunk_len, 32767);
        assert_eq!(config.durability, Durability::Wal);
        assert_eq!(config.wal_compact_after, 64);
        assert_eq!(config.checksum_policy, ChecksumPolicy::Strict);
    }

    #[test]
    fn test_config_overrides() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::load(&write_config(
            &dir,
            json!({
                "namespace": "world_1",
                "durability": "snapshot",
                "checksum_policy": "lenient"
            }),
        ))
        .unwrap();
        assert_eq!(config.namespace, "world_1");
        assert_eq!(config.durability, Durability::Snapshot);
        assert_eq!(config.checksum_policy, ChecksumPolicy::Lenient);
    }

    #[test]
    fn test_config_rejects_zero_chunk_len() {
        let dir = TempDir::new().unwrap();
        let result = StoreConfig::load(&write_config(&dir, json!({"max_chunk_len": 0})));
        assert!(matches!(result, Err(DbError::Config(_))));
    }

    #[test]
    fn test_config_rejects_bad_namespace() {
        assert!(StoreConfig::default()
            .with_namespace("a.b")
            .validate()
            .is_err());
        assert!(StoreConfig::default().with_namespace("").validate().is_err());
    }

    #[test]
    fn test_config_rejects_unknown_durability() {
        let dir = TempDir::new().unwrap();
        let result = StoreConfig::load(&write_config(&dir, json!({"durability": "never"})));
        assert!(result.is_err());
    }
}
