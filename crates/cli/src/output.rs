//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use report_lib::Workbook;
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Row for the per-sheet summary table
#[derive(Debug, Tabled, Serialize)]
pub struct SheetSummary {
    #[tabled(rename = "Sheet")]
    pub sheet: String,
    #[tabled(rename = "Rows")]
    pub rows: usize,
}

impl SheetSummary {
    pub fn from_workbook(workbook: &Workbook) -> Vec<Self> {
        workbook
            .sheets
            .iter()
            .map(|s| SheetSummary {
                sheet: s.name.clone(),
                rows: s.rows.len(),
            })
            .collect()
    }
}

/// Render a workbook in the requested format
pub fn render_workbook(workbook: &Workbook, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(workbook.render_tables()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(workbook)?),
    }
}

/// Print the sheets of a workbook and how many rows each holds
pub fn print_summary(workbook: &Workbook) {
    let summary = SheetSummary::from_workbook(workbook);
    if summary.is_empty() {
        print_warning("No sheets written");
        return;
    }
    let table = Table::new(summary).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}
