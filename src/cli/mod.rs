//! CLI module for slotdb
//!
//! Provides command-line access to a file-backed database:
//! - inspect: Print the stored metadata without loading rows
//! - dump: Print every committed row as JSON lines
//! - verify: Load the database fully and report what was restored
//! - compact: Force a snapshot save, folding the WAL into it

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, StoreArgs};
pub use commands::{compact, dump, inspect, run, run_command, verify};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_line, write_response};
