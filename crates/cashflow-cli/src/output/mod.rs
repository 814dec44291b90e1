pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use colored::Colorize;
use serde_json::Value;
use std::io;

use crate::OutputFormat;

/// Dispatch output to the appropriate formatter.
///
/// Only the JSON formatter carries the envelope's warnings, so the others
/// repeat them on stderr. A closed stdout (`cfm model | head`) is not an error.
pub fn format_output(format: &OutputFormat, value: &Value) -> io::Result<()> {
    let written = match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => {
            table::print_table(value);
            Ok(())
        }
        OutputFormat::Csv => {
            csv_out::print_csv(value);
            Ok(())
        }
        OutputFormat::Minimal => {
            minimal::print_minimal(value);
            Ok(())
        }
    };

    if !matches!(format, OutputFormat::Json) {
        for warning in warnings(value) {
            eprintln!("{}: {}", "warning".yellow().bold(), warning);
        }
    }

    match written {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

/// Envelope warnings (model, scenario and audit runs all carry them).
fn warnings(value: &Value) -> Vec<&str> {
    value
        .get("warnings")
        .and_then(Value::as_array)
        .map(|w| w.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}
