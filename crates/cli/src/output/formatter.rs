//! Output formatter for human-readable and JSON output
//!
//! Ensures consistent output formatting across all commands.

use comfy_table::presets::NOTHING;
use comfy_table::{CellAlignment, Table};
use console::style;
use serde::Serialize;

use super::OutputConfig;

#[derive(Debug, Clone, Copy)]
enum Status {
    Done,
    Skipped,
    Failed,
}

impl Status {
    fn glyph(self) -> &'static str {
        match self {
            Status::Done => "✓",
            Status::Skipped => "⚠",
            Status::Failed => "✗",
        }
    }
}

/// Writes command results to the terminal
///
/// Results go to stdout, diagnostics to stderr. In JSON mode stdout only
/// ever carries one JSON document.
#[derive(Debug, Clone)]
pub struct Formatter {
    config: OutputConfig,
}

impl Formatter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn is_json(&self) -> bool {
        self.config.json
    }

    /// Colors are never used in JSON mode
    pub fn colors_enabled(&self) -> bool {
        !self.config.no_color && !self.config.json
    }

    /// Output configuration this formatter was built from
    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Report a completed operation on stdout
    pub fn success(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }
        println!("{}", self.status_line(Status::Done, message));
    }

    /// Report a failure on stderr, even in quiet mode
    ///
    /// In JSON mode the message is wrapped as `{"error": ...}` so stdout
    /// stays machine-readable.
    pub fn error(&self, message: &str) {
        if self.config.json {
            eprintln!("{}", serde_json::json!({ "error": message }));
        } else {
            eprintln!("{}", self.status_line(Status::Failed, message));
        }
    }

    /// Report a per-file problem that did not stop the command
    pub fn warning(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }
        eprintln!("{}", self.status_line(Status::Skipped, message));
    }

    fn status_line(&self, status: Status, message: &str) -> String {
        let glyph = status.glyph();
        if !self.colors_enabled() {
            return format!("{glyph} {message}");
        }
        let glyph = match status {
            Status::Done => style(glyph).green(),
            Status::Skipped => style(glyph).yellow(),
            Status::Failed => style(glyph).red().bold(),
        };
        format!("{glyph} {message}")
    }

    /// Print `value` as pretty JSON on stdout
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error serializing output: {e}"),
        }
    }

    /// Print a line of text (respects quiet mode)
    pub fn println(&self, message: &str) {
        if self.config.quiet {
            return;
        }
        println!("{message}");
    }

    /// Print borderless columns; the first `right_aligned` columns are right-aligned
    pub fn table(&self, rows: Vec<Vec<String>>, right_aligned: usize) {
        if self.config.quiet || rows.is_empty() {
            return;
        }
        println!("{}", render_table(rows, right_aligned));
    }

    /// Highlight a name the way directories are shown
    pub fn dir_name(&self, name: &str) -> String {
        if self.colors_enabled() {
            style(name).blue().bold().to_string()
        } else {
            name.to_string()
        }
    }
}

fn render_table(rows: Vec<Vec<String>>, right_aligned: usize) -> String {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    for row in rows {
        table.add_row(row);
    }
    for index in 0..right_aligned {
        if let Some(column) = table.column_mut(index) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
    table
        .lines()
        .map(|line| line.trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(OutputConfig::default())
    }
}
