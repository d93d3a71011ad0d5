use core_batch::BatchError;
use core_inventory::InventoryError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Cannot open workbook {path}: {message}")]
    Open { path: PathBuf, message: String },

    #[error("Sheet '{sheet}' not found (available: {})", available.join(", "))]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },

    #[error("Column '{column}' not found in the header row of sheet '{sheet}'")]
    MissingColumn { column: String, sheet: String },

    #[error("Cannot write workbook {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("Spreadsheet task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, SpreadsheetError>;

impl From<SpreadsheetError> for BatchError {
    fn from(err: SpreadsheetError) -> Self {
        match err {
            SpreadsheetError::Write { .. } => BatchError::Report(err.to_string()),
            other => BatchError::Source(other.to_string()),
        }
    }
}

impl From<SpreadsheetError> for InventoryError {
    fn from(err: SpreadsheetError) -> Self {
        InventoryError::Sink(err.to_string())
    }
}

impl From<tokio::task::JoinError> for SpreadsheetError {
    fn from(err: tokio::task::JoinError) -> Self {
        SpreadsheetError::Task(err.to_string())
    }
}
