//! slotdb - a transactional, versioned table store persisted through
//! bounded-length string slots
//!
//! Layers, leaves first:
//!
//! - `codec`: byte reader / varint writer, LZ4 frames, printable transport
//! - `value`: row payloads, ordered keys, deterministic row encoding
//! - `schema`: declared tables per schema version
//! - `meta`: root metadata with A/B sides for snapshot parts and WAL
//! - `mvcc`: transactions over per-table row stores
//! - `snapshot` / `wal`: the two persisted formats
//! - `slots`: the host persistence primitive and chunking
//! - `db`: open, recovery and the side-switching persist path
//! - `save`: the coalescing background save loop

pub mod cli;
pub mod codec;
pub mod crash_point;
pub mod db;
pub mod meta;
pub mod mvcc;
pub mod save;
pub mod schema;
pub mod slots;
pub mod snapshot;
pub mod value;
pub mod wal;

pub use db::{Database, DbError, DbResult, Durability, StoreConfig};
pub use mvcc::{Table, Transaction, TxnId, TxnStatus};
pub use save::SaveCoordinator;
pub use schema::{Schema, SchemaRegistry};
pub use slots::{FileSlots, MemorySlots, SlotStore};
pub use value::{Json, Key, Storable, Value};
