//! Write-ahead log
//!
//! Records committed transactions between snapshot saves. Like row-store
//! parts, the persisted log alternates between two sides; the active side
//! always holds every entry newer than the active snapshot.

mod errors;
mod log;
mod record;

pub use errors::{WalError, WalResult};
pub use log::{decode_entries, encode_entries, WalLog};
pub use record::{WalEntry, WalMutation};
