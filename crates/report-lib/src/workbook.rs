//! Report workbook: named sheets of string rows
//!
//! A workbook is an explicit value owned by the caller. It is opened (or
//! created) once, sheets are added and filled, and it is saved once at the
//! end of a successful run. On disk it is an xlsx spreadsheet with the
//! headers in the first row of each sheet.

use crate::error::{ReportError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::Path;
use tabled::{builder::Builder, settings::Style};
use tracing::{debug, info};
use umya_spreadsheet::Worksheet;

/// Report file written when no other path is configured
pub const DEFAULT_REPORT_FILE: &str = "k8s_report.xlsx";

/// Placeholder sheet for a workbook saved without sheets
const EMPTY_SHEET: &str = "Sheet1";

/// One sheet: a header row and data rows of the same width
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    fn from_worksheet(worksheet: &Worksheet) -> Option<Self> {
        let rows = worksheet.get_highest_row();
        if rows == 0 {
            return None;
        }
        let columns = worksheet.get_highest_column();
        let values = |row: u32| -> Vec<String> {
            (1..=columns)
                .map(|column| worksheet.get_value((column, row)))
                .collect()
        };

        Some(Self {
            name: worksheet.get_name().to_string(),
            headers: values(1),
            rows: (2..=rows).map(values).collect(),
        })
    }

    fn fill_worksheet(&self, worksheet: &mut Worksheet) {
        let lines = std::iter::once(&self.headers).chain(self.rows.iter());
        for (row, cells) in (1u32..).zip(lines) {
            for (column, value) in (1u32..).zip(cells) {
                // Stored as text so "2" and "true" read back unchanged
                worksheet
                    .get_cell_mut((column, row))
                    .set_value_string(value.as_str());
            }
        }
    }
}

/// Collection of sheets written to a single report file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workbook {
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            sheets: Vec::new(),
        }
    }

    /// Open an existing report spreadsheet, or start a new one if it does not exist
    pub fn open_or_create(path: &Path) -> Result<Self> {
        match std::fs::metadata(path) {
            Ok(_) => {
                let book = umya_spreadsheet::reader::xlsx::read(path)
                    .map_err(|e| spreadsheet_error(path, e))?;
                let sheets: Vec<Sheet> = book
                    .get_sheet_collection()
                    .iter()
                    .filter_map(Sheet::from_worksheet)
                    .collect();
                info!(path = %path.display(), sheets = sheets.len(), "Opened existing report");
                Ok(Self {
                    generated_at: Utc::now(),
                    sheets,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Report file does not exist, creating a new one");
                Ok(Self::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write the workbook as an xlsx spreadsheet
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut book = umya_spreadsheet::new_file_empty_worksheet();
        for sheet in &self.sheets {
            let worksheet = book
                .new_sheet(sheet.name.as_str())
                .map_err(|e| spreadsheet_error(path, e))?;
            sheet.fill_worksheet(worksheet);
        }
        if self.sheets.is_empty() {
            book.new_sheet(EMPTY_SHEET)
                .map_err(|e| spreadsheet_error(path, e))?;
        }

        umya_spreadsheet::writer::xlsx::write(&book, path)
            .map_err(|e| spreadsheet_error(path, e))?;
        info!(path = %path.display(), sheets = self.sheets.len(), "Report saved");
        Ok(())
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Add a sheet with headers; an existing sheet of the same name is kept
    pub fn add_sheet(&mut self, name: &str, headers: Vec<String>) {
        if self.sheet(name).is_some() {
            info!(sheet = %name, "Sheet already exists, no need to add it again");
            return;
        }
        self.sheets.push(Sheet {
            name: name.to_string(),
            headers,
            rows: Vec::new(),
        });
        info!(sheet = %name, "Added new sheet to report");
    }

    /// Replace the data rows of a sheet
    ///
    /// Every row must have exactly one cell per header; otherwise nothing is
    /// written and the sheet keeps its previous rows.
    pub fn write_rows(&mut self, name: &str, rows: Vec<Vec<String>>) -> Result<()> {
        let sheet = self
            .sheets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| ReportError::Render {
                sheet: name.to_string(),
                reason: "sheet does not exist".to_string(),
            })?;

        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != sheet.headers.len())
        {
            return Err(ReportError::Render {
                sheet: name.to_string(),
                reason: format!(
                    "row {} has {} cells, expected {}",
                    index + 2,
                    row.len(),
                    sheet.headers.len()
                ),
            });
        }

        sheet.rows = rows;
        info!(sheet = %name, rows = sheet.rows.len(), "Wrote rows to sheet");
        Ok(())
    }

    /// Render every sheet as a titled table
    pub fn render_tables(&self) -> String {
        let mut out = String::new();
        for sheet in &self.sheets {
            let mut builder = Builder::default();
            builder.push_record(sheet.headers.clone());
            for row in &sheet.rows {
                builder.push_record(row.clone());
            }
            let table = builder.build().with(Style::rounded()).to_string();

            out.push_str(&sheet.name);
            out.push('\n');
            out.push_str(&table);
            out.push_str(&format!("\nTotal: {} rows\n\n", sheet.rows.len()));
        }
        out
    }
}

fn spreadsheet_error(path: &Path, err: impl Display) -> ReportError {
    ReportError::Spreadsheet {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
