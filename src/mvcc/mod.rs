//! Transactions and per-table row stores
//!
//! This module provides:
//! - `TxnId` / `TxnCounter` - transaction identity, bounded by `MAX_TXN_ID`
//! - `RowStore` - committed rows plus pending versions keyed by (txn, key)
//! - `Transaction` - begin / commit / abort over any number of row stores
//! - `Table` - typed handle bound to one transaction

mod counter;
mod errors;
mod row_store;
mod table;
mod transaction;
mod txn_id;

pub use counter::TxnCounter;
pub use errors::{TxnError, TxnResult, TxnStatus};
pub use row_store::{PendingVersion, RowSnapshot, RowStore};
pub use table::Table;
pub use transaction::Transaction;
pub use txn_id::{TxnId, MAX_TXN_ID};
