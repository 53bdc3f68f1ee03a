//! slotdb CLI entry point
//!
//! This is a minimal entrypoint that:
//! 1. Installs the log subscriber (stderr, `RUST_LOG`)
//! 2. Dispatches to CLI commands (via cli::run)
//! 3. Prints errors to stderr (the JSON error response goes to stdout)
//! 4. Exits with non-zero on failure
//!
//! All logic is delegated to the CLI module.

use slotdb::cli;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
