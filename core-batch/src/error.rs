use thiserror::Error;

/// Run-level failures. Any of these aborts the run before (or instead of)
/// processing items.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Worklist unavailable: {0}")]
    Source(String),

    #[error("Failed to write failure report: {0}")]
    Report(String),

    #[error("Resume cursor error: {0}")]
    Cursor(String),

    #[error("Invalid batch configuration: {0}")]
    Config(String),
}

/// Failures scoped to a single work item. They never leave the item's task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Check(String),

    #[error("create failed after {attempts} attempt(s): {message}")]
    Operation { message: String, attempts: u32 },
}

pub type Result<T> = std::result::Result<T, BatchError>;
