//! Schema version registry
//!
//! Maps version numbers to schemas. A version is declared once with
//! `version(n)` and receives its schema once through `stores(schema)`;
//! neither step can be repeated for the same number.

use std::collections::BTreeMap;

use super::errors::{SchemaError, SchemaResult};
use super::types::Schema;
use crate::codec::{put_varint, ByteReader, CodecResult};

/// Ordered version history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaRegistry {
    versions: BTreeMap<u32, Option<Schema>>,
}

/// A freshly declared version awaiting its schema.
#[must_use = "a declared version needs a schema attached with `stores`"]
pub struct VersionDecl<'a> {
    registry: &'a mut SchemaRegistry,
    version: u32,
}

impl VersionDecl<'_> {
    pub fn number(&self) -> u32 {
        self.version
    }

    /// Attaches the schema for this version.
    pub fn stores(self, schema: Schema) -> SchemaResult<()> {
        self.registry.attach(self.version, schema)
    }
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares version `num`. Fails if it was declared before.
    pub fn version(&mut self, num: u32) -> SchemaResult<VersionDecl<'_>> {
        if self.versions.contains_key(&num) {
            return Err(SchemaError::DuplicateVersion(num));
        }
        self.versions.insert(num, None);
        Ok(VersionDecl {
            registry: self,
            version: num,
        })
    }

    fn attach(&mut self, num: u32, schema: Schema) -> SchemaResult<()> {
        match self.versions.get_mut(&num) {
            None => Err(SchemaError::UnknownVersion(num)),
            Some(Some(_)) => Err(SchemaError::SchemaAlreadyAttached(num)),
            Some(slot) => {
                *slot = Some(schema);
                Ok(())
            }
        }
    }

    pub fn is_declared(&self, num: u32) -> bool {
        self.versions.contains_key(&num)
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Schema attached to version `num`.
    pub fn schema(&self, num: u32) -> SchemaResult<&Schema> {
        match self.versions.get(&num) {
            None => Err(SchemaError::UnknownVersion(num)),
            Some(None) => Err(SchemaError::MissingSchema(num)),
            Some(Some(schema)) => Ok(schema),
        }
    }

    /// Highest version carrying a schema.
    pub fn latest(&self) -> SchemaResult<(u32, &Schema)> {
        self.versions
            .iter()
            .rev()
            .find_map(|(num, schema)| schema.as_ref().map(|s| (*num, s)))
            .ok_or(SchemaError::NoVersions)
    }

    pub fn versions(&self) -> impl Iterator<Item = (u32, Option<&Schema>)> {
        self.versions.iter().map(|(n, s)| (*n, s.as_ref()))
    }

    /// Folds declarations from `declared` into this (persisted) history.
    ///
    /// Versions unknown here are adopted. A version known on both sides must
    /// carry the same schema; a persisted version without a schema adopts the
    /// declared one.
    pub fn merge(&mut self, declared: &SchemaRegistry) -> SchemaResult<()> {
        for (num, schema) in &declared.versions {
            match (self.versions.get_mut(num), schema) {
                (None, _) => {
                    self.versions.insert(*num, schema.clone());
                }
                (Some(mine @ None), Some(theirs)) => {
                    *mine = Some(theirs.clone());
                }
                (Some(Some(mine)), Some(theirs)) if mine != theirs => {
                    return Err(SchemaError::Conflict(*num));
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        put_varint(buf, self.versions.len() as u32);
        for (num, schema) in &self.versions {
            put_varint(buf, *num);
            match schema {
                Some(schema) => {
                    buf.push(1);
                    schema.encode(buf);
                }
                None => buf.push(0),
            }
        }
    }

    pub(crate) fn decode(reader: &mut ByteReader<'_>) -> CodecResult<Self> {
        let count = reader.varint("version count")?;
        let mut versions = BTreeMap::new();
        for _ in 0..count {
            let num = reader.varint("version number")?;
            let schema = match reader.u8("schema flag")? {
                0 => None,
                _ => Some(Schema::decode(reader)?),
            };
            versions.insert(num, schema);
        }
        Ok(Self { versions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players() -> Schema {
        Schema::new().table("players")
    }

    #[test]
    fn test_declare_and_attach() {
        let mut registry = SchemaRegistry::new();
        registry.version(1).unwrap().stores(players()).unwrap();
        assert_eq!(registry.schema(1).unwrap(), &players());
        assert_eq!(registry.latest().unwrap().0, 1);
    }

    #[test]
    fn test_redeclaring_version_fails_every_time() {
        let mut registry = SchemaRegistry::new();
        registry.version(3).unwrap().stores(players()).unwrap();

        for _ in 0..2 {
            assert_eq!(
                registry.version(3).err(),
                Some(SchemaError::DuplicateVersion(3))
            );
        }
        // The original declaration is untouched.
        assert_eq!(registry.schema(3).unwrap(), &players());
    }

    #[test]
    fn test_declared_without_schema() {
        let mut registry = SchemaRegistry::new();
        let _ = registry.version(2).unwrap();
        assert_eq!(registry.schema(2), Err(SchemaError::MissingSchema(2)));
        assert_eq!(registry.latest().err(), Some(SchemaError::NoVersions));
    }

    #[test]
    fn test_attach_twice_fails() {
        let mut registry = SchemaRegistry::new();
        registry.version(1).unwrap().stores(players()).unwrap();
        assert_eq!(
            registry.attach(1, Schema::new()),
            Err(SchemaError::SchemaAlreadyAttached(1))
        );
    }

    #[test]
    fn test_latest_skips_versions_without_schema() {
        let mut registry = SchemaRegistry::new();
        registry.version(1).unwrap().stores(players()).unwrap();
        let _ = registry.version(5).unwrap();
        assert_eq!(registry.latest().unwrap().0, 1);
    }

    #[test]
    fn test_merge_adopts_and_detects_conflict() {
        let mut persisted = SchemaRegistry::new();
        persisted.version(1).unwrap().stores(players()).unwrap();

        let mut declared = SchemaRegistry::new();
        declared.version(1).unwrap().stores(players()).unwrap();
        declared
            .version(2)
            .unwrap()
            .stores(players().table("chests"))
            .unwrap();

        persisted.merge(&declared).unwrap();
        assert_eq!(persisted.latest().unwrap().0, 2);

        let mut conflicting = SchemaRegistry::new();
        conflicting
            .version(1)
            .unwrap()
            .stores(Schema::new().table("mobs"))
            .unwrap();
        assert_eq!(persisted.merge(&conflicting), Err(SchemaError::Conflict(1)));
    }

    #[test]
    fn test_binary_roundtrip() {
        let mut registry = SchemaRegistry::new();
        registry.version(1).unwrap().stores(players()).unwrap();
        let _ = registry.version(2).unwrap();

        let mut buf = Vec::new();
        registry.encode(&mut buf);
        let decoded = SchemaRegistry::decode(&mut ByteReader::new(&buf)).unwrap();
        assert_eq!(decoded, registry);
    }
}
