//! Shared output helpers for text and JSON modes.

use colored::Colorize;
use serde::Serialize;

use crate::OutputFormat;

/// Print a result as pretty JSON. Text mode prints nothing; commands format text themselves.
pub fn print<T: Serialize>(value: &T, format: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    if let OutputFormat::Json = format {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("{}: failed to serialize output: {}", "Error".red().bold(), e),
        }
    }
}

/// One-line success message in text mode.
pub fn success(message: &str, format: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    if let OutputFormat::Text = format {
        println!("{} {}", "✓".green().bold(), message);
    }
}

/// Warning on stderr, shown in both modes unless quiet.
pub fn warning(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{} {}", "⚠".yellow().bold(), message);
    }
}
