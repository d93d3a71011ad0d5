use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One listed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRow {
    /// Slash-separated path of the containing folder; empty at the root
    pub parent_path: String,
    pub name: String,
    pub id: String,
    pub size: Option<u64>,
    pub mime_type: Option<String>,
    pub is_folder: bool,
}

impl InventoryRow {
    /// Path of the entry itself.
    pub fn path(&self) -> String {
        join_path(&self.parent_path, &self.name)
    }

    /// Containing folder as shown in reports: `/` at the root.
    pub fn display_parent(&self) -> &str {
        if self.parent_path.is_empty() {
            "/"
        } else {
            &self.parent_path
        }
    }
}

pub(crate) fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySummary {
    pub folders: u64,
    pub files: u64,
}

impl InventorySummary {
    pub fn from_rows(rows: &[InventoryRow]) -> Self {
        rows.iter().fold(Self::default(), |mut acc, row| {
            if row.is_folder {
                acc.folders += 1;
            } else {
                acc.files += 1;
            }
            acc
        })
    }
}

/// Destination for a finished listing.
#[async_trait]
pub trait InventorySink: Send + Sync {
    async fn write_rows(&self, rows: &[InventoryRow]) -> Result<()>;
}
