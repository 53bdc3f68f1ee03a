//! JSON output for the CLI
//!
//! - Single results: one JSON object `{"status": "ok", "data": ...}`
//! - Row dumps: one JSON object per line
//! - Failures: `{"status": "error", "code": ..., "message": ...}`
//! - UTF-8 only

use std::io::{self, Write};

use serde_json::Value;

use super::errors::CliResult;

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    write_error_to(&mut stdout, code, message)?;
    stdout.flush()?;
    Ok(())
}

fn write_error_to(out: &mut impl Write, code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_line(out, &response)
}

/// Write one bare JSON value as a line
pub fn write_line(out: &mut impl Write, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
