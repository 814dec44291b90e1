use serde_json::Value;
use std::io::{self, Write};

/// Pretty-print the whole envelope to stdout, warnings included.
pub fn print_json(value: &Value) -> io::Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    out.flush()
}
