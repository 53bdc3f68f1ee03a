//! Opening a database from its slots
//!
//! Sequence:
//!
//! 1. read and verify the metadata blob (absent means a fresh database)
//! 2. merge the schema versions declared in code into the persisted history
//! 3. create one row store per table of the latest schema
//! 4. decode the active parts side with the schema it was written with and
//!    bulk-load its rows
//! 5. replay the active WAL side in sequence order
//! 6. resume the id counter after every id seen in persisted state
//!
//! Tables in the snapshot or WAL that the latest schema no longer declares
//! are dropped with a warning. Everything else that fails to parse is
//! reported to the caller.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use super::config::StoreConfig;
use super::errors::DbResult;
use super::shared::SharedParts;
use crate::meta::Metadata;
use crate::mvcc::{RowStore, TxnCounter, TxnId};
use crate::schema::SchemaRegistry;
use crate::slots::{read_chunks, SlotNames, SlotStore};
use crate::snapshot::read_snapshot;
use crate::wal::{decode_entries, WalLog};

/// Reads the stored metadata, or a fresh one if none was ever written.
pub(crate) fn read_metadata(slots: &dyn SlotStore, names: &SlotNames) -> DbResult<Metadata> {
    match slots.get(&names.meta())? {
        Some(text) => Ok(Metadata::deserialise(&text)?),
        None => Ok(Metadata::new()),
    }
}

pub(crate) fn recover(
    slots: Arc<dyn SlotStore>,
    config: StoreConfig,
    declared: &SchemaRegistry,
) -> DbResult<SharedParts> {
    config.validate()?;
    let names = SlotNames::new(config.namespace.clone());

    let mut meta = read_metadata(slots.as_ref(), &names)?;
    meta.registry_mut().merge(declared)?;
    let (schema_version, schema) = meta.registry().latest()?;
    let schema = schema.clone();

    let tables: BTreeMap<Arc<str>, Arc<RowStore>> = schema
        .table_names()
        .map(|name| {
            let id: Arc<str> = Arc::from(name);
            (Arc::clone(&id), Arc::new(RowStore::new(id)))
        })
        .collect();

    let parts = *meta.active_parts();
    let mut restored_rows = 0usize;
    if parts.chunks > 0 {
        let text = read_chunks(
            slots.as_ref(),
            &names.parts(meta.parts_side()),
            parts.chunks,
        )?;
        let parts_schema = meta.registry().schema(parts.version)?;
        let decoded = read_snapshot(&text, parts_schema, parts.version, config.checksum_policy)?;
        for (table, rows) in decoded {
            let Some(store) = tables.get(table.as_str()) else {
                warn!(
                    table = %table,
                    rows = rows.len(),
                    from_version = parts.version,
                    to_version = schema_version,
                    "dropping table absent from the current schema"
                );
                continue;
            };
            restored_rows += rows.len();
            for (key, value) in rows {
                store.load_row_unchecked(key, value)?;
            }
        }
    }

    let wal_meta = *meta.active_wal();
    let entries = if wal_meta.chunks > 0 {
        let text = read_chunks(
            slots.as_ref(),
            &names.wal(meta.wal_side()),
            wal_meta.chunks,
        )?;
        decode_entries(&text, config.checksum_policy)?
    } else {
        Vec::new()
    };
    let mut skipped = 0usize;
    for entry in &entries {
        for mutation in &entry.mutations {
            match tables.get(&mutation.table) {
                Some(store) => {
                    store.apply_unchecked(mutation.key.clone(), mutation.version.clone())?
                }
                None => skipped += 1,
            }
        }
    }
    if skipped > 0 {
        warn!(
            mutations = skipped,
            "skipped replayed writes to tables absent from the current schema"
        );
    }

    let wal = WalLog::from_entries(entries);
    let last_txn = wal.max_txn().value().max(meta.txn_high_water());
    let counter = TxnCounter::starting_after(TxnId::new(last_txn));

    info!(
        namespace = %config.namespace,
        version = schema_version,
        parts_side = %meta.parts_side(),
        wal_side = %meta.wal_side(),
        tables = tables.len(),
        rows = restored_rows,
        wal_entries = wal.len(),
        "database opened"
    );

    Ok(SharedParts {
        config,
        slots,
        meta,
        schema_version,
        tables,
        wal,
        counter,
    })
}
