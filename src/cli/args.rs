//! CLI argument definitions using clap
//!
//! Commands:
//! - slotdb inspect --dir <path>
//! - slotdb dump --dir <path> [--table <id>]
//! - slotdb verify --dir <path>
//! - slotdb compact --dir <path>

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// slotdb - transactional table store over bounded string slots
#[derive(Parser, Debug)]
#[command(name = "slotdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Where the database lives and how it is configured
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Directory holding the slot files
    #[arg(long)]
    pub dir: PathBuf,

    /// Slot name prefix; overrides the config file
    #[arg(long)]
    pub namespace: Option<String>,

    /// Path to a JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print metadata: schema versions, active sides, chunk counts
    Inspect {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Print committed rows as JSON lines
    Dump {
        #[command(flatten)]
        store: StoreArgs,

        /// Only dump this table
        #[arg(long)]
        table: Option<String>,
    },

    /// Load snapshot and WAL, reporting row counts per table
    Verify {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Write a snapshot now and fold the WAL into it
    Compact {
        #[command(flatten)]
        store: StoreArgs,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
