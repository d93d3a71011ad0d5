//! # Folder Inventory
//!
//! Recursive listing of a Drive folder tree for spreadsheet export.

pub mod error;
pub mod types;
pub mod walker;

pub use error::{InventoryError, Result};
pub use types::{InventoryRow, InventorySink, InventorySummary};
pub use walker::FolderInventory;
