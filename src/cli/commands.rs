//! CLI command implementations
//!
//! Every command works on a `FileSlots` directory. Commands that need rows
//! open the database with an empty schema registry, which adopts the schema
//! history stored in the metadata.

use std::io::{self, Write};
use std::sync::Arc;

use serde_json::{json, Value as JsonValue};

use crate::db::{Database, DbError, StoreConfig};
use crate::meta::{Metadata, Side};
use crate::schema::SchemaRegistry;
use crate::slots::{FileSlots, SlotNames, SlotStore};
use crate::value::{Key, KeyPart};

use super::args::{Command, StoreArgs};
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_line, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    let result = run_command(cli.command);
    if let Err(e) = &result {
        write_error(e.code_str(), e.message())?;
    }
    result
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::io_error(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        match cmd {
            Command::Inspect { store } => inspect(&store),
            Command::Dump { store, table } => dump(&store, table.as_deref()).await,
            Command::Verify { store } => verify(&store).await,
            Command::Compact { store } => compact(&store).await,
        }
    })
}

/// Print the stored metadata.
///
/// Reads only the metadata slot; no snapshot or WAL chunk is decoded.
pub fn inspect(args: &StoreArgs) -> CliResult<()> {
    let (slots, config) = open_slots(args)?;
    let meta = read_metadata(&slots, &config)?;
    write_response(describe_metadata(&config, &meta))
}

/// Print committed rows, one JSON object per line.
pub async fn dump(args: &StoreArgs, table: Option<&str>) -> CliResult<()> {
    let db = open_database(args).await?;
    let ids: Vec<String> = match table {
        Some(id) => vec![id.to_string()],
        None => db.table_ids().map(str::to_string).collect(),
    };

    let mut stdout = io::stdout().lock();
    for id in ids {
        for (key, value) in db.read_table(&id)? {
            let line = json!({
                "table": id,
                "key": key_to_json(&key),
                "value": JsonValue::from(value),
            });
            write_line(&mut stdout, &line)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

/// Load everything and report what came back.
pub async fn verify(args: &StoreArgs) -> CliResult<()> {
    let db = open_database(args).await?;
    let mut tables = serde_json::Map::new();
    let mut total = 0usize;
    for id in db.table_ids() {
        let rows = db.read_table(id)?.len();
        total += rows;
        tables.insert(id.to_string(), json!(rows));
    }

    write_response(json!({
        "verified": true,
        "schema_version": db.schema_version(),
        "rows": total,
        "tables": tables,
        "wal_entries": db.wal_len()?,
    }))
}

/// Force a snapshot save.
pub async fn compact(args: &StoreArgs) -> CliResult<()> {
    let db = open_database(args).await?;
    let wal_before = db.wal_len()?;
    let report = db.save_snapshot().await?;

    write_response(json!({
        "compacted": true,
        "wal_entries_folded": wal_before.saturating_sub(report.wal_entries),
        "report": serde_json::to_value(report)?,
    }))
}

fn load_config(args: &StoreArgs) -> CliResult<StoreConfig> {
    let mut config = match &args.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };
    if let Some(namespace) = &args.namespace {
        config = config.with_namespace(namespace.clone());
    }
    config.validate()?;
    Ok(config)
}

fn open_slots(args: &StoreArgs) -> CliResult<(FileSlots, StoreConfig)> {
    let config = load_config(args)?;
    if !args.dir.is_dir() {
        return Err(CliError::not_initialized(&config.namespace));
    }
    let slots = FileSlots::open(&args.dir).map_err(DbError::from)?;
    Ok((slots, config))
}

fn read_metadata(slots: &FileSlots, config: &StoreConfig) -> CliResult<Metadata> {
    let names = SlotNames::new(config.namespace.clone());
    let text = slots
        .get(&names.meta())
        .map_err(DbError::from)?
        .ok_or_else(|| CliError::not_initialized(&config.namespace))?;
    Ok(Metadata::deserialise(&text).map_err(DbError::from)?)
}

async fn open_database(args: &StoreArgs) -> CliResult<Database> {
    let (slots, config) = open_slots(args)?;
    // Refuse to create a database from a read-only command.
    read_metadata(&slots, &config)?;
    let db = Database::open(
        Arc::new(slots) as Arc<dyn SlotStore>,
        config,
        SchemaRegistry::new(),
    )
    .await?;
    Ok(db)
}

fn describe_metadata(config: &StoreConfig, meta: &Metadata) -> JsonValue {
    let versions: Vec<JsonValue> = meta
        .registry()
        .versions()
        .map(|(version, schema)| {
            let tables: Vec<&str> = schema.map(|s| s.table_names().collect()).unwrap_or_default();
            json!({ "version": version, "tables": tables })
        })
        .collect();

    json!({
        "namespace": config.namespace,
        "txn_high_water": meta.txn_high_water(),
        "schema_versions": versions,
        "parts": {
            "active": meta.parts_side(),
            "a": meta.parts().get(Side::A),
            "b": meta.parts().get(Side::B),
        },
        "wal": {
            "active": meta.wal_side(),
            "a": meta.wal().get(Side::A),
            "b": meta.wal().get(Side::B),
        },
    })
}

fn key_to_json(key: &Key) -> JsonValue {
    JsonValue::Array(
        key.parts()
            .iter()
            .map(|part| match part {
                KeyPart::Bool(b) => json!(b),
                KeyPart::Int(i) => json!(i),
                KeyPart::Str(s) => json!(s),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::value::Value;
    use tempfile::TempDir;

    fn args(dir: &TempDir) -> StoreArgs {
        StoreArgs {
            dir: dir.path().to_path_buf(),
            namespace: None,
            config: None,
        }
    }

    async fn seed(dir: &TempDir) {
        let mut registry = SchemaRegistry::new();
        registry
            .version(1)
            .unwrap()
            .stores(Schema::new().table("players"))
            .unwrap();
        let slots = Arc::new(FileSlots::open(dir.path()).unwrap());
        let db = Database::open(slots as Arc<dyn SlotStore>, StoreConfig::default(), registry)
            .await
            .unwrap();
        let txn = db.begin().unwrap();
        txn.table::<Value>("players")
            .unwrap()
            .put("p1", Value::from(20.0))
            .unwrap();
        txn.commit().await.unwrap();
    }

    #[test]
    fn test_key_to_json() {
        let key = Key::from(("overworld", 12i64));
        assert_eq!(key_to_json(&key), json!(["overworld", 12]));
    }

    #[tokio::test]
    async fn test_open_refuses_empty_directory() {
        let dir = TempDir::new().unwrap();
        let err = open_database(&args(&dir)).await.unwrap_err();
        assert_eq!(err.code_str(), "SLOTDB_CLI_NOT_INITIALIZED");
    }

    #[tokio::test]
    async fn test_open_adopts_stored_schema() {
        let dir = TempDir::new().unwrap();
        seed(&dir).await;

        let db = open_database(&args(&dir)).await.unwrap();
        assert_eq!(db.schema_version(), 1);
        assert_eq!(db.read_table("players").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_describe_metadata_after_compact() {
        let dir = TempDir::new().unwrap();
        seed(&dir).await;
        compact(&args(&dir)).await.unwrap();

        let (slots, config) = open_slots(&args(&dir)).unwrap();
        let meta = read_metadata(&slots, &config).unwrap();
        let described = describe_metadata(&config, &meta);
        assert_eq!(described["namespace"], "slotdb");
        assert_eq!(described["schema_versions"][0]["tables"], json!(["players"]));
        assert_eq!(described["parts"]["active"], "b");
        assert_eq!(described["parts"]["b"]["version"], 1);
    }
}
