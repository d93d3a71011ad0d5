//! Work items, per-item outcomes and run aggregates.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ItemError;

/// Shown in the failure ledger when the display name never got resolved.
pub const UNRESOLVED_NAME: &str = "<unresolved>";

/// One worklist row: make a shortcut to `source_id` inside
/// `destination_container_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// 1-based position in the source, for reporting only
    pub row_index: u64,
    pub source_id: String,
    pub destination_container_id: String,
    /// Shortcut name; looked up from the source file when absent
    pub display_name: Option<String>,
}

impl WorkItem {
    pub fn new(
        row_index: u64,
        source_id: impl Into<String>,
        destination_container_id: impl Into<String>,
    ) -> Self {
        Self {
            row_index,
            source_id: source_id.into(),
            destination_container_id: destination_container_id.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn validate(&self) -> Result<(), ItemError> {
        match (
            self.source_id.trim().is_empty(),
            self.destination_container_id.trim().is_empty(),
        ) {
            (false, false) => Ok(()),
            (true, true) => Err(ItemError::Validation(
                "missing source id and destination folder id".to_string(),
            )),
            (true, false) => Err(ItemError::Validation("missing source id".to_string())),
            (false, true) => Err(ItemError::Validation(
                "missing destination folder id".to_string(),
            )),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// The configured display name, ignoring blank cells.
    pub fn given_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Final result of processing one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Created { result_id: String },
    SkippedExisting,
    SkippedInvalid { reason: String },
    /// `last_attempt` is the number of create attempts made; 0 when the item
    /// failed before reaching the create call.
    Failed { error: String, last_attempt: u32 },
}

impl OperationOutcome {
    pub fn failed(error: &ItemError) -> Self {
        let last_attempt = match error {
            ItemError::Operation { attempts, .. } => *attempts,
            _ => 0,
        };
        OperationOutcome::Failed {
            error: error.to_string(),
            last_attempt,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, OperationOutcome::Failed { .. })
    }
}

/// A permanently failed item, as written to the failure report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub row_index: u64,
    pub source_id: String,
    pub display_name: String,
    pub error: String,
}

/// Outcome counters for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub succeeded: u64,
    pub skipped_existing: u64,
    pub skipped_invalid: u64,
    pub failed: u64,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &OperationOutcome) {
        match outcome {
            OperationOutcome::Created { .. } => self.succeeded += 1,
            OperationOutcome::SkippedExisting => self.skipped_existing += 1,
            OperationOutcome::SkippedInvalid { .. } => self.skipped_invalid += 1,
            OperationOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.succeeded + self.skipped_existing + self.skipped_invalid + self.failed
    }
}

/// Everything a finished run hands back.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    /// In the order items settled, chunk by chunk
    pub failures: Vec<FailureRecord>,
    pub chunks_processed: u64,
    /// Rows skipped by `start_row` or the resume cursor; not in `summary`
    pub skipped_before_start: u64,
    pub elapsed: Duration,
}
