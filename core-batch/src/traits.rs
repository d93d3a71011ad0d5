//! Seams between the driver and its collaborators.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{FailureRecord, RunSummary, WorkItem};

/// Supplies the worklist. Failing here is a setup error.
#[async_trait]
pub trait WorklistSource: Send + Sync {
    async fn read_all(&self) -> Result<Vec<WorkItem>>;
}

/// Receives the results of a finished run.
#[async_trait]
pub trait ResultReporter: Send + Sync {
    /// Persist the failure ledger. Only called when it is non-empty.
    async fn write_failures(&self, failures: &[FailureRecord]) -> Result<()>;

    fn print_summary(&self, summary: &RunSummary);
}
