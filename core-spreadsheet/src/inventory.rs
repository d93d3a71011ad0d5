//! Folder inventory export.
//!
//! Folder-only listings use the columns `Folder`, `ID`. With file rows the
//! sheet becomes `Path`, `Name`, `Size`, `ID`, where `Path` is the
//! containing folder.

use async_trait::async_trait;
use core_inventory::{InventoryRow, InventorySink};
use core_runtime::config::InventoryConfig;
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Result, SpreadsheetError};
use crate::xlsx::{save, sheet_with_header, write_error, Column};

const FOLDER_COLUMNS: [Column<'static>; 2] = [("Folder", 40.0), ("ID", 45.0)];
const FILE_COLUMNS: [Column<'static>; 4] =
    [("Path", 50.0), ("Name", 40.0), ("Size", 12.0), ("ID", 45.0)];

#[derive(Debug, Clone)]
pub struct XlsxInventoryWriter {
    path: PathBuf,
    sheet_name: String,
    include_files: bool,
}

impl XlsxInventoryWriter {
    pub fn new(path: impl Into<PathBuf>, sheet_name: impl Into<String>, include_files: bool) -> Self {
        Self {
            path: path.into(),
            sheet_name: sheet_name.into(),
            include_files,
        }
    }

    pub fn from_config(config: &InventoryConfig) -> Self {
        Self::new(&config.output_path, &config.sheet_name, config.include_files)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_workbook(&self, rows: &[InventoryRow]) -> Result<()> {
        let mut workbook = Workbook::new();
        let columns: &[Column<'_>] = if self.include_files {
            &FILE_COLUMNS
        } else {
            &FOLDER_COLUMNS
        };
        let sheet = sheet_with_header(&mut workbook, &self.sheet_name, columns)
            .map_err(write_error(&self.path))?;

        let listed = rows.iter().filter(|r| self.include_files || r.is_folder);
        for (i, entry) in listed.enumerate() {
            let row = i as u32 + 1;
            let written = if self.include_files {
                sheet
                    .write_string(row, 0, entry.display_parent())
                    .and_then(|s| s.write_string(row, 1, &entry.name))
                    .and_then(|s| match entry.size {
                        Some(size) => s.write_number(row, 2, size as f64),
                        None => Ok(s),
                    })
                    .and_then(|s| s.write_string(row, 3, &entry.id))
            } else {
                sheet
                    .write_string(row, 0, &entry.name)
                    .and_then(|s| s.write_string(row, 1, &entry.id))
            };
            written.map_err(write_error(&self.path))?;
        }

        save(&mut workbook, &self.path)
    }
}

#[async_trait]
impl InventorySink for XlsxInventoryWriter {
    async fn write_rows(&self, rows: &[InventoryRow]) -> core_inventory::Result<()> {
        let writer = self.clone();
        let rows = rows.to_vec();
        let count = rows.len();

        tokio::task::spawn_blocking(move || writer.write_workbook(&rows))
            .await
            .map_err(SpreadsheetError::from)??;

        info!(path = %self.path.display(), rows = count, "Inventory written");
        Ok(())
    }
}
