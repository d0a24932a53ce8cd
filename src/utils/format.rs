//! Console output formatting
//!
//! Tables for listings, JSON for scripting, and coloured status lines.
//! Colour is dropped entirely with `--no-color`.

use crossterm::style::{Color as CrosstermColor, Stylize};
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Color, Modify, Padding, Style, Width},
    Table, Tabled,
};

use crate::error::{BlobctlError, Result};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        }
    }
}

/// Color theme for console output
#[derive(Debug, Clone)]
pub struct ColorTheme {
    pub success: CrosstermColor,
    pub warning: CrosstermColor,
    pub error: CrosstermColor,
    pub info: CrosstermColor,
    pub accent: CrosstermColor,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            success: CrosstermColor::Green,
            warning: CrosstermColor::Yellow,
            error: CrosstermColor::Red,
            info: CrosstermColor::Cyan,
            accent: CrosstermColor::Magenta,
        }
    }
}

/// Renders rows as a table or as JSON
pub struct TableFormatter {
    format: OutputFormat,
    no_color: bool,
}

impl TableFormatter {
    pub fn new(format: OutputFormat, no_color: bool) -> Self {
        Self { format, no_color }
    }

    /// Format rows; `empty_message` is used for an empty table
    pub fn format_rows<T: Tabled + Serialize>(&self, data: &[T], empty_message: &str) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(data)
                .map_err(|e| BlobctlError::serialization(e.to_string())),
            OutputFormat::Table if data.is_empty() => Ok(empty_message.to_string()),
            OutputFormat::Table => {
                let mut table = Table::new(data);
                if let Ok((width, _)) = crossterm::terminal::size() {
                    table.with(Width::wrap(width as usize));
                }
                Ok(format_table(table, self.no_color))
            }
        }
    }
}

/// Display utilities for status lines
pub struct DisplayUtils {
    theme: ColorTheme,
    no_color: bool,
}

impl DisplayUtils {
    pub fn new(no_color: bool) -> Self {
        Self {
            theme: ColorTheme::default(),
            no_color,
        }
    }

    fn styled(&self, symbol: &str, message: &str, color: CrosstermColor) -> String {
        if self.no_color {
            format!("{symbol} {message}")
        } else {
            format!("{symbol} {}", message.with(color))
        }
    }

    pub fn print_success(&self, message: &str) {
        println!("{}", self.styled("✓", message, self.theme.success));
    }

    pub fn print_warning(&self, message: &str) {
        eprintln!("{}", self.styled("⚠", message, self.theme.warning));
    }

    /// Errors go to stderr
    pub fn print_error(&self, message: &str) {
        eprintln!("{}", self.styled("✗", message, self.theme.error));
    }

    pub fn print_info(&self, message: &str) {
        println!("{}", self.styled("ℹ", message, self.theme.info));
    }

    /// Format key-value pairs with aligned keys
    pub fn format_key_value_pairs(&self, pairs: &[(&str, &str)]) -> String {
        let max_key_length = pairs.iter().map(|(key, _)| key.len()).max().unwrap_or(0);

        pairs
            .iter()
            .map(|(key, value)| {
                let padded = format!("{:width$}", key, width = max_key_length);
                let formatted_key = if self.no_color {
                    padded
                } else {
                    padded.with(self.theme.accent).bold().to_string()
                };
                format!("{}: {}", formatted_key, value)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Apply the house table style
pub fn format_table(mut table: Table, no_color: bool) -> String {
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .with(Padding::new(1, 1, 0, 0));

    if !no_color {
        table.with(Modify::new(Rows::first()).with(Color::FG_BLUE));
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Tabled, Serialize)]
    struct Row {
        name: String,
        size: u64,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                name: "a.txt".to_string(),
                size: 1,
            },
            Row {
                name: "b.txt".to_string(),
                size: 2,
            },
        ]
    }

    #[test]
    fn test_table_contains_rows() {
        let formatter = TableFormatter::new(OutputFormat::Table, true);
        let output = formatter.format_rows(&rows(), "No files found").unwrap();
        assert!(output.contains("a.txt"));
        assert!(output.contains("b.txt"));
    }

    #[test]
    fn test_empty_table_message() {
        let formatter = TableFormatter::new(OutputFormat::Table, true);
        let output = formatter.format_rows::<Row>(&[], "No files found").unwrap();
        assert_eq!(output, "No files found");
    }

    #[test]
    fn test_json_output() {
        let formatter = TableFormatter::new(OutputFormat::Json, true);
        let output = formatter.format_rows(&rows(), "No files found").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[1]["name"], "b.txt");

        let empty = formatter.format_rows::<Row>(&[], "No files found").unwrap();
        assert_eq!(empty, "[]");
    }

    #[test]
    fn test_key_value_alignment() {
        let display = DisplayUtils::new(true);
        let output = display.format_key_value_pairs(&[("Account", "vaultstore1"), ("Container", "files")]);
        assert_eq!(output, "Account  : vaultstore1\nContainer: files");
    }
}
