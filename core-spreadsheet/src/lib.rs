//! # Spreadsheet I/O
//!
//! xlsx adapters around the batch and inventory engines:
//! - [`ExcelWorklistSource`] reads the shortcut worklist
//! - [`XlsxFailureReporter`] writes the failure ledger and prints the summary
//! - [`XlsxInventoryWriter`] writes a folder inventory
//!
//! Workbook reads and writes are blocking and run on tokio's blocking pool.

pub mod error;
pub mod failures;
pub mod inventory;
pub mod worklist;
mod xlsx;

pub use error::{Result, SpreadsheetError};
pub use failures::{format_summary, XlsxFailureReporter};
pub use inventory::XlsxInventoryWriter;
pub use worklist::ExcelWorklistSource;
