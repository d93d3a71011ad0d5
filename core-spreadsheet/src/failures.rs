//! Failure ledger export and the console run summary.

use async_trait::async_trait;
use core_batch::{FailureRecord, ResultReporter, RunSummary};
use core_runtime::config::ShortcutJobConfig;
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Result, SpreadsheetError};
use crate::xlsx::{save, sheet_with_header, write_error, Column};

const FAILURE_COLUMNS: [Column<'static>; 4] = [
    ("Row", 8.0),
    ("File ID", 40.0),
    ("File Name", 40.0),
    ("Error", 80.0),
];

#[derive(Debug, Clone)]
pub struct XlsxFailureReporter {
    path: PathBuf,
    sheet_name: String,
}

impl XlsxFailureReporter {
    pub fn new(path: impl Into<PathBuf>, sheet_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sheet_name: sheet_name.into(),
        }
    }

    pub fn from_config(config: &ShortcutJobConfig) -> Self {
        Self::new(&config.failure_report_path, &config.failure_sheet_name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Blocking write of the ledger, one row per failed item.
    pub fn write_workbook(&self, failures: &[FailureRecord]) -> Result<()> {
        let mut workbook = Workbook::new();
        let sheet = sheet_with_header(&mut workbook, &self.sheet_name, &FAILURE_COLUMNS)
            .map_err(write_error(&self.path))?;

        for (i, failure) in failures.iter().enumerate() {
            let row = i as u32 + 1;
            sheet
                .write_number(row, 0, failure.row_index as f64)
                .and_then(|s| s.write_string(row, 1, &failure.source_id))
                .and_then(|s| s.write_string(row, 2, &failure.display_name))
                .and_then(|s| s.write_string(row, 3, &failure.error))
                .map_err(write_error(&self.path))?;
        }

        save(&mut workbook, &self.path)
    }
}

#[async_trait]
impl ResultReporter for XlsxFailureReporter {
    async fn write_failures(&self, failures: &[FailureRecord]) -> core_batch::Result<()> {
        let reporter = self.clone();
        let failures = failures.to_vec();
        let count = failures.len();

        tokio::task::spawn_blocking(move || reporter.write_workbook(&failures))
            .await
            .map_err(SpreadsheetError::from)??;

        info!(path = %self.path.display(), failures = count, "Failure report written");
        println!(
            "{} failed row(s) written to {}",
            count,
            self.path.display()
        );
        Ok(())
    }

    fn print_summary(&self, summary: &RunSummary) {
        info!(
            succeeded = summary.succeeded,
            skipped_existing = summary.skipped_existing,
            skipped_invalid = summary.skipped_invalid,
            failed = summary.failed,
            "Run summary"
        );
        println!("{}", format_summary(summary));
    }
}

/// Console rendering of the run counters.
pub fn format_summary(summary: &RunSummary) -> String {
    format!(
        "Summary\n  Shortcuts created:       {}\n  Already present:         {}\n  Skipped (missing data):  {}\n  Failed:                  {}\n  Total rows:              {}",
        summary.succeeded,
        summary.skipped_existing,
        summary.skipped_invalid,
        summary.failed,
        summary.total()
    )
}
