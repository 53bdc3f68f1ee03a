//! Schema type definitions
//!
//! A schema is the set of tables a database version stores, each with its
//! declared indexes. Index declarations are recorded and persisted with the
//! version history; they are not maintained as secondary structures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::codec::{put_str, put_varint, ByteReader, CodecResult};

/// A declared index over fields of a table's rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    /// Index name, unique within its table
    pub name: String,
    /// Field path evaluated against each row payload
    pub fields: Vec<String>,
    /// Whether indexed values must be distinct
    #[serde(default)]
    pub unique: bool,
}

impl IndexDef {
    /// Non-unique index over the given fields
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    /// Marks the index unique
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Table declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    #[serde(default)]
    pub indexes: Vec<IndexDef>,
}

impl TableDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }
}

/// The set of tables stored by one database version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub tables: BTreeMap<String, TableDef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table with no indexes.
    pub fn table(self, name: impl Into<String>) -> Self {
        self.table_with(name, TableDef::new())
    }

    /// Adds a table with its declaration.
    pub fn table_with(mut self, name: impl Into<String>, def: TableDef) -> Self {
        self.tables.insert(name.into(), def);
        self
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Appends the compact binary form used inside the metadata blob.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        put_varint(buf, self.tables.len() as u32);
        for (name, def) in &self.tables {
            put_str(buf, name);
            put_varint(buf, def.indexes.len() as u32);
            for index in &def.indexes {
                put_str(buf, &index.name);
                buf.push(u8::from(index.unique));
                put_varint(buf, index.fields.len() as u32);
                for field in &index.fields {
                    put_str(buf, field);
                }
            }
        }
    }

    /// Reads the form written by [`Schema::encode`].
    pub fn decode(reader: &mut ByteReader<'_>) -> CodecResult<Self> {
        let mut tables = BTreeMap::new();
        let table_count = reader.varint("table count")?;
        for _ in 0..table_count {
            let name = reader.str("table name")?.to_string();
            let index_count = reader.varint("index count")?;
            let mut indexes = Vec::new();
            for _ in 0..index_count {
                let index_name = reader.str("index name")?.to_string();
                let unique = reader.u8("index unique flag")? != 0;
                let field_count = reader.varint("index field count")?;
                let mut fields = Vec::new();
                for _ in 0..field_count {
                    fields.push(reader.str("index field")?.to_string());
                }
                indexes.push(IndexDef {
                    name: index_name,
                    fields,
                    unique,
                });
            }
            tables.insert(name, TableDef { indexes });
        }
        Ok(Self { tables })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        Schema::new()
            .table_with(
                "players",
                TableDef::new()
                    .index(IndexDef::new("by_name", ["name"]).unique())
                    .index(IndexDef::new("by_pos", ["pos", "x"])),
            )
            .table("chests")
    }

    #[test]
    fn test_binary_roundtrip() {
        let schema = sample();
        let mut buf = Vec::new();
        schema.encode(&mut buf);
        let mut reader = ByteReader::new(&buf);
        assert_eq!(Schema::decode(&mut reader).unwrap(), schema);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_json_declaration() {
        let json = r#"{"tables": {"players": {"indexes": [{"name": "by_name", "fields": ["name"]}]}}}"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        assert!(schema.contains("players"));
        assert!(!schema.tables["players"].indexes[0].unique);
    }

    #[test]
    fn test_table_names_sorted() {
        let names: Vec<_> = sample().table_names().map(str::to_string).collect();
        assert_eq!(names, vec!["chests", "players"]);
    }
}
