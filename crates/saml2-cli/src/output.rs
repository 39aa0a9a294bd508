//! Operator status lines.
//!
//! Stdout carries only the command's document (URL, HTML form, XML or JSON)
//! so it can be piped. Status lines go to stderr.

use colored::{ColoredString, Colorize};

/// Prints a success line.
pub fn success(message: &str) {
    status("✓".green().bold(), message);
}

/// Prints an error line.
pub fn error(message: &str) {
    status("✗".red().bold(), message);
}

/// Prints a warning line.
pub fn warning(message: &str) {
    status("⚠".yellow().bold(), message);
}

fn status(marker: ColoredString, message: &str) {
    eprintln!("{marker} {message}");
}
