//! Snapshot reader
//!
//! Inverse of the writer: transport decode, header check, decompress, then
//! walk the records. Parsing stops at the end of the stream or at the first
//! byte that is neither a table nor a row mark; any bytes after such a byte
//! are ignored with a warning.

use std::collections::BTreeMap;

use tracing::warn;

use super::errors::{SnapshotError, SnapshotResult};
use super::{ROW_MARK, SNAPSHOT_MAGIC, SNAPSHOT_VERSION, TABLE_MARK};
use crate::codec::{decompress, transport, ByteReader, ChecksumPolicy};
use crate::schema::{Schema, SchemaError};
use crate::value::{decode_row, Key, Value};

/// Rows of one table, in the order they were stored.
pub type TableRows = Vec<(Key, Value)>;

/// Parses snapshot text.
///
/// Table ids are checked against `schema`, the schema of `version`.
pub fn read_snapshot(
    text: &str,
    schema: &Schema,
    version: u32,
    policy: ChecksumPolicy,
) -> SnapshotResult<BTreeMap<String, TableRows>> {
    let bytes = transport::decode(text)?;
    let header_len = SNAPSHOT_MAGIC.len() + 1;
    if bytes.len() < header_len || &bytes[..SNAPSHOT_MAGIC.len()] != SNAPSHOT_MAGIC {
        return Err(SnapshotError::BadMagic);
    }
    if bytes[SNAPSHOT_MAGIC.len()] != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(bytes[SNAPSHOT_MAGIC.len()]));
    }

    let payload = decompress(&bytes[header_len..], policy)?;
    let mut reader = ByteReader::new(&payload);
    let mut tables: BTreeMap<String, TableRows> = BTreeMap::new();
    let mut current: Option<(String, TableRows)> = None;

    while !reader.is_empty() {
        let offset = reader.position();
        match reader.u8("snapshot mark")? {
            TABLE_MARK => {
                let id = reader.str("table id")?;
                if !schema.contains(id) {
                    return Err(SchemaError::UnknownTable {
                        table: id.to_string(),
                        version,
                    }
                    .into());
                }
                if let Some((done, rows)) = current.take() {
                    finalize(&mut tables, done, rows)?;
                }
                if tables.contains_key(id) {
                    return Err(SnapshotError::DuplicateTable(id.to_string()));
                }
                current = Some((id.to_string(), Vec::new()));
            }
            ROW_MARK => {
                let row = reader.bytes("row")?;
                let Some((_, rows)) = current.as_mut() else {
                    return Err(SnapshotError::RowOutsideTable { offset });
                };
                rows.push(decode_row(row)?);
            }
            mark => {
                warn!(
                    mark,
                    offset,
                    ignored_bytes = reader.remaining() + 1,
                    "snapshot stream ended at an unknown mark"
                );
                break;
            }
        }
    }

    if let Some((done, rows)) = current {
        finalize(&mut tables, done, rows)?;
    }
    Ok(tables)
}

fn finalize(
    tables: &mut BTreeMap<String, TableRows>,
    id: String,
    rows: TableRows,
) -> SnapshotResult<()> {
    if tables.contains_key(&id) {
        return Err(SnapshotError::DuplicateTable(id));
    }
    tables.insert(id, rows);
    Ok(())
}
