//! # Batch Shortcut Engine
//!
//! Turns a worklist of (source file, destination folder) rows into Drive
//! shortcuts.
//!
//! ## Overview
//!
//! This module handles:
//! - Chunked processing with a cap on in-flight remote calls
//! - Duplicate detection before every create
//! - Retry with exponential backoff for transient create failures
//! - A ledger of permanently failed rows and a run summary
//! - An optional resume cursor between runs

pub mod cursor;
pub mod driver;
pub mod error;
pub mod limiter;
pub mod retry;
pub mod traits;
pub mod types;

pub use cursor::{CursorStore, JsonFileCursorStore};
pub use driver::BatchDriver;
pub use error::{BatchError, ItemError, Result};
pub use limiter::{ConcurrencyLimiter, LimiterError, TaskHandle};
pub use retry::{
    EventBusRetryObserver, LoggingRetryObserver, RetryError, RetryNotice, RetryObserver,
    RetryPolicy, Retryable,
};
pub use traits::{ResultReporter, WorklistSource};
pub use types::{
    FailureRecord, OperationOutcome, RunReport, RunSummary, WorkItem, UNRESOLVED_NAME,
};
