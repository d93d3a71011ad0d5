//! Worklist rows read from an xlsx sheet.
//!
//! The first row of the sheet is the header; columns are located by header
//! text, so their order does not matter. Every later row becomes a
//! [`WorkItem`] whose `row_index` is the 1-based sheet row. Fully blank rows
//! are dropped; rows with some cells missing are kept and left to the
//! driver's validation.

use async_trait::async_trait;
use calamine::{open_workbook_auto, Data, Reader};
use core_batch::{WorkItem, WorklistSource};
use core_runtime::config::{ColumnMapping, ShortcutJobConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Result, SpreadsheetError};

#[derive(Debug, Clone)]
pub struct ExcelWorklistSource {
    path: PathBuf,
    sheet_name: String,
    columns: ColumnMapping,
}

impl ExcelWorklistSource {
    pub fn new(path: impl Into<PathBuf>, sheet_name: impl Into<String>, columns: ColumnMapping) -> Self {
        Self {
            path: path.into(),
            sheet_name: sheet_name.into(),
            columns,
        }
    }

    pub fn from_config(config: &ShortcutJobConfig) -> Self {
        Self::new(&config.excel_path, &config.sheet_name, config.columns.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Blocking read of the whole sheet.
    pub fn read_items(&self) -> Result<Vec<WorkItem>> {
        let mut workbook = open_workbook_auto(&self.path).map_err(|e| SpreadsheetError::Open {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let available = workbook.sheet_names();
        if !available.iter().any(|name| name == &self.sheet_name) {
            return Err(SpreadsheetError::SheetNotFound {
                sheet: self.sheet_name.clone(),
                available,
            });
        }

        let range = workbook
            .worksheet_range(&self.sheet_name)
            .map_err(|e| SpreadsheetError::Open {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        // Absolute sheet row of the header, 0-based.
        let first_row = range.start().map_or(0, |(row, _)| row as u64);
        let mut rows = range.rows();

        let header: Vec<String> = rows
            .next()
            .map(|cells| cells.iter().map(cell_text).collect())
            .unwrap_or_default();

        let file_id = self.column(&header, &self.columns.file_id)?;
        let folder_id = self.column(&header, &self.columns.folder_id)?;
        let file_name = self
            .columns
            .file_name
            .as_deref()
            .map(|name| self.column(&header, name))
            .transpose()?;

        let mut items = Vec::new();
        for (offset, cells) in rows.enumerate() {
            if cells.iter().all(|cell| cell_text(cell).is_empty()) {
                continue;
            }

            // Header is sheet row first_row + 1 (1-based); data follows it.
            let row_index = first_row + offset as u64 + 2;
            let text = |col: usize| cells.get(col).map(cell_text).unwrap_or_default();

            let mut item = WorkItem::new(row_index, text(file_id), text(folder_id));
            if let Some(name) = file_name.map(text).filter(|name| !name.is_empty()) {
                item = item.with_display_name(name);
            }
            items.push(item);
        }

        info!(
            path = %self.path.display(),
            sheet = %self.sheet_name,
            rows = items.len(),
            "Worklist loaded"
        );
        Ok(items)
    }

    fn column(&self, header: &[String], name: &str) -> Result<usize> {
        let position = header.iter().position(|h| h == name.trim());
        debug!(column = name, position = ?position, "Resolved worklist column");
        position.ok_or_else(|| SpreadsheetError::MissingColumn {
            column: name.to_string(),
            sheet: self.sheet_name.clone(),
        })
    }
}

#[async_trait]
impl WorklistSource for ExcelWorklistSource {
    async fn read_all(&self) -> core_batch::Result<Vec<WorkItem>> {
        let source = self.clone();
        let items = tokio::task::spawn_blocking(move || source.read_items())
            .await
            .map_err(SpreadsheetError::from)??;
        Ok(items)
    }
}

/// Cell contents as trimmed text. Whole numbers lose their `.0` so numeric
/// ids read back the way they were typed.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        other => other.to_string().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String("  abc ".into())), "abc");
        assert_eq!(cell_text(&Data::Float(12345.0)), "12345");
        assert_eq!(cell_text(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::Bool(true)), "true");
    }
}
