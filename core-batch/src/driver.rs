//! # Batch Driver
//!
//! Drives a worklist to completion against a [`StorageProvider`].
//!
//! ## Flow
//!
//! ```text
//! worklist ─┬─ chunk 1 ──> limiter ──> item tasks ──> settle all ──> fold ──> cursor
//!           ├─ chunk 2 ──> ...
//!           └─ chunk N ──> ...                                            └──> RunReport
//! ```
//!
//! Chunks run strictly one after another; inside a chunk every item is
//! submitted at once and the chunk waits for all of them, whatever their
//! result. Item tasks only return outcomes. Counters and the failure ledger
//! are updated here, after the chunk settles.
//!
//! Per item:
//!
//! 1. invalid rows become `SkippedInvalid` without touching the network
//! 2. a missing display name is looked up from the source file
//! 3. one existence check on (folder, name); an existing item is skipped
//! 4. the create call, under the [`RetryPolicy`]
//!
//! Steps 2 and 3 are not retried.

use bridge_traits::storage::StorageProvider;
use core_runtime::config::ShortcutJobConfig;
use core_runtime::events::{BatchEvent, CoreEvent, EventBus};
use futures::future::join_all;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::cursor::{CursorStore, JsonFileCursorStore};
use crate::error::{BatchError, ItemError, Result};
use crate::limiter::{ConcurrencyLimiter, TaskHandle};
use crate::retry::{EventBusRetryObserver, RetryError, RetryNotice, RetryObserver, RetryPolicy};
use crate::traits::{ResultReporter, WorklistSource};
use crate::types::{
    FailureRecord, OperationOutcome, RunReport, RunSummary, WorkItem, UNRESOLVED_NAME,
};

pub struct BatchDriver {
    provider: Arc<dyn StorageProvider>,
    chunk_size: usize,
    max_concurrent: usize,
    start_row: usize,
    policy: RetryPolicy,
    cursor: Option<Arc<dyn CursorStore>>,
    events: Option<EventBus>,
    retry_observer: Option<Arc<dyn RetryObserver>>,
}

impl BatchDriver {
    /// Build a driver from the job settings. A configured
    /// `resume_cursor_path` enables the JSON cursor file.
    pub fn new(provider: Arc<dyn StorageProvider>, config: &ShortcutJobConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(BatchError::Config("chunk_size must be at least 1".into()));
        }
        if config.max_concurrent == 0 {
            return Err(BatchError::Config(
                "max_concurrent must be at least 1".into(),
            ));
        }
        if config.max_attempts == 0 {
            return Err(BatchError::Config("max_attempts must be at least 1".into()));
        }

        let cursor = config
            .resume_cursor_path
            .as_ref()
            .map(|path| Arc::new(JsonFileCursorStore::new(path)) as Arc<dyn CursorStore>);

        Ok(Self {
            provider,
            chunk_size: config.chunk_size,
            max_concurrent: config.max_concurrent,
            start_row: config.start_row,
            policy: RetryPolicy::from_config(config),
            cursor,
            events: None,
            retry_observer: None,
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cursor_store(mut self, cursor: Arc<dyn CursorStore>) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Extra observer for create retries, in addition to the log line and
    /// the `RetryScheduled` event.
    pub fn with_retry_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.retry_observer = Some(observer);
        self
    }

    /// Read the worklist, run it, then hand the results to `reporter`.
    ///
    /// The failure ledger is only written when it has entries; the summary is
    /// printed even when writing the ledger fails. In that case every failed
    /// row is logged at `error!` before the write error is returned.
    pub async fn run_and_report(
        &self,
        source: &dyn WorklistSource,
        reporter: &dyn ResultReporter,
    ) -> Result<RunReport> {
        let items = source.read_all().await?;
        let report = self.run(items).await?;

        let written = if report.failures.is_empty() {
            Ok(())
        } else {
            reporter.write_failures(&report.failures).await
        };
        reporter.print_summary(&report.summary);

        if let Err(e) = written {
            for failure in &report.failures {
                error!(
                    row = failure.row_index,
                    source_id = %failure.source_id,
                    name = %failure.display_name,
                    error = %failure.error,
                    "Failed row not written to the failure report"
                );
            }
            return Err(e);
        }
        Ok(report)
    }

    /// Process `items` chunk by chunk.
    ///
    /// Only a failing resume cursor load aborts the run; per-item errors end
    /// up in the returned ledger.
    #[instrument(skip_all, fields(chunk_size = self.chunk_size, max_concurrent = self.max_concurrent))]
    pub async fn run(&self, items: Vec<WorkItem>) -> Result<RunReport> {
        let started = Instant::now();

        let resume_after = match &self.cursor {
            Some(cursor) => cursor.load().await?,
            None => None,
        };

        let listed = items.len();
        let first_row = self.start_row as u64;
        let pending: Vec<WorkItem> = items
            .into_iter()
            .filter(|item| item.row_index >= first_row)
            .filter(|item| resume_after.map_or(true, |row| item.row_index > row))
            .collect();
        let skipped_before_start = (listed - pending.len()) as u64;
        let total = pending.len() as u64;

        info!(
            total,
            skipped_before_start,
            resume_after = ?resume_after,
            "Starting shortcut run"
        );
        self.emit(BatchEvent::RunStarted { total_items: total });

        let limiter = ConcurrencyLimiter::new(self.max_concurrent);
        let mut summary = RunSummary::default();
        let mut failures = Vec::new();
        let mut chunks_processed = 0u64;
        let mut last_saved = resume_after;
        // The cursor never passes a failed row, so a rerun retries it.
        let mut cursor_blocked = false;

        let mut remaining = pending.into_iter();
        loop {
            let chunk: Vec<WorkItem> = remaining.by_ref().take(self.chunk_size).collect();
            if chunk.is_empty() {
                break;
            }

            let settled = self.run_chunk(&limiter, chunk).await;

            let mut settled_through = None;
            for item in settled {
                if item.outcome.is_failure() {
                    cursor_blocked = true;
                } else if !cursor_blocked {
                    settled_through = Some(item.row_index);
                }

                summary.record(&item.outcome);
                if let OperationOutcome::Failed { error, .. } = item.outcome {
                    self.emit(BatchEvent::ItemFailed {
                        row_index: item.row_index,
                        source_id: item.source_id.clone(),
                        error: error.clone(),
                    });
                    failures.push(FailureRecord {
                        row_index: item.row_index,
                        source_id: item.source_id,
                        display_name: item
                            .display_name
                            .unwrap_or_else(|| UNRESOLVED_NAME.to_string()),
                        error,
                    });
                }
            }
            chunks_processed += 1;

            info!(
                chunk = chunks_processed,
                processed = summary.total(),
                total,
                succeeded = summary.succeeded,
                skipped_existing = summary.skipped_existing,
                skipped_invalid = summary.skipped_invalid,
                failed = summary.failed,
                "Chunk settled"
            );
            self.emit(BatchEvent::ChunkCompleted {
                chunk_index: chunks_processed,
                processed: summary.total(),
                total,
                succeeded: summary.succeeded,
                skipped_existing: summary.skipped_existing,
                skipped_invalid: summary.skipped_invalid,
                failed: summary.failed,
            });

            if let Some(row) = settled_through.filter(|row| last_saved.map_or(true, |s| *row > s)) {
                self.save_cursor(row).await;
                last_saved = Some(row);
            }
        }

        if failures.is_empty() {
            self.clear_cursor().await;
        }

        let elapsed = started.elapsed();
        info!(
            succeeded = summary.succeeded,
            skipped_existing = summary.skipped_existing,
            skipped_invalid = summary.skipped_invalid,
            failed = summary.failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "Shortcut run completed"
        );
        self.emit(BatchEvent::RunCompleted {
            succeeded: summary.succeeded,
            skipped_existing: summary.skipped_existing,
            skipped_invalid: summary.skipped_invalid,
            failed: summary.failed,
            elapsed_ms: elapsed.as_millis() as u64,
        });

        Ok(RunReport {
            summary,
            failures,
            chunks_processed,
            skipped_before_start,
            elapsed,
        })
    }

    /// Submit every item of the chunk and wait for all of them. Results come
    /// back in worklist order.
    async fn run_chunk(&self, limiter: &ConcurrencyLimiter, chunk: Vec<WorkItem>) -> Vec<SettledItem> {
        let mut slots = Vec::with_capacity(chunk.len());

        for item in chunk {
            if let Err(ItemError::Validation(reason)) = item.validate() {
                warn!(row = item.row_index, %reason, "Skipping incomplete row");
                slots.push(Slot::Settled(SettledItem {
                    outcome: OperationOutcome::SkippedInvalid { reason },
                    ..SettledItem::pending(item)
                }));
                continue;
            }

            let task = ItemTask {
                provider: self.provider.clone(),
                policy: self.policy.clone(),
                observer: ItemRetryObserver {
                    row_index: item.row_index,
                    source_id: item.source_id.clone(),
                    events: self
                        .events
                        .clone()
                        .map(|bus| EventBusRetryObserver::new(bus, item.row_index)),
                    extra: self.retry_observer.clone(),
                },
            };
            let placeholder = SettledItem::pending(item.clone());
            slots.push(Slot::Running(placeholder, limiter.submit(task.run(item))));
        }

        let waiting = slots.into_iter().map(|slot| async move {
            match slot {
                Slot::Settled(item) => item,
                Slot::Running(placeholder, handle) => match handle.await {
                    Ok(item) => item,
                    Err(e) => {
                        error!(row = placeholder.row_index, error = %e, "Item task aborted");
                        SettledItem {
                            outcome: OperationOutcome::Failed {
                                error: e.to_string(),
                                last_attempt: 0,
                            },
                            ..placeholder
                        }
                    }
                },
            }
        });

        join_all(waiting).await
    }

    async fn save_cursor(&self, row: u64) {
        if let Some(cursor) = &self.cursor {
            if let Err(e) = cursor.save(row).await {
                warn!(row, error = %e, "Failed to save resume cursor");
            }
        }
    }

    async fn clear_cursor(&self) {
        if let Some(cursor) = &self.cursor {
            if let Err(e) = cursor.clear().await {
                warn!(error = %e, "Failed to clear resume cursor");
            }
        }
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(bus) = &self.events {
            let _ = bus.emit(CoreEvent::Batch(event));
        }
    }
}

/// An item with its final outcome and the best name known for it.
struct SettledItem {
    row_index: u64,
    source_id: String,
    display_name: Option<String>,
    outcome: OperationOutcome,
}

impl SettledItem {
    /// Metadata of an item whose outcome is not known yet.
    fn pending(item: WorkItem) -> Self {
        let display_name = item.given_name().map(str::to_string);
        Self {
            row_index: item.row_index,
            source_id: item.source_id,
            display_name,
            outcome: OperationOutcome::SkippedExisting,
        }
    }
}

enum Slot {
    Settled(SettledItem),
    Running(SettledItem, TaskHandle<SettledItem>),
}

/// Everything one item needs, owned so it can run on a spawned task.
struct ItemTask {
    provider: Arc<dyn StorageProvider>,
    policy: RetryPolicy,
    observer: ItemRetryObserver,
}

impl ItemTask {
    async fn run(self, item: WorkItem) -> SettledItem {
        let mut name = item.given_name().map(str::to_string);
        let outcome = match self.execute(&item, &mut name).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    row = item.row_index,
                    source_id = %item.source_id,
                    container_id = %item.destination_container_id,
                    error = %e,
                    "Row failed permanently"
                );
                OperationOutcome::failed(&e)
            }
        };

        SettledItem {
            row_index: item.row_index,
            source_id: item.source_id,
            display_name: name,
            outcome,
        }
    }

    async fn execute(
        &self,
        item: &WorkItem,
        name: &mut Option<String>,
    ) -> std::result::Result<OperationOutcome, ItemError> {
        let resolved = match name.as_ref() {
            Some(given) => given.clone(),
            None => {
                let looked_up = self
                    .provider
                    .get_name(&item.source_id)
                    .await
                    .map_err(|e| ItemError::Check(format!("name lookup failed: {}", e)))?;
                *name = Some(looked_up.clone());
                looked_up
            }
        };

        let exists = self
            .provider
            .exists(&item.destination_container_id, &resolved)
            .await
            .map_err(|e| ItemError::Check(format!("existence check failed: {}", e)))?;
        if exists {
            debug!(row = item.row_index, name = %resolved, "Already present, skipping");
            return Ok(OperationOutcome::SkippedExisting);
        }

        let provider = &self.provider;
        let source = item.source_id.as_str();
        let container = item.destination_container_id.as_str();
        let shortcut_name = resolved.as_str();

        match self
            .policy
            .run(
                move |_| provider.create_shortcut(source, container, shortcut_name),
                &self.observer,
            )
            .await
        {
            Ok(created) => {
                debug!(row = item.row_index, shortcut_id = %created.id, "Shortcut created");
                Ok(OperationOutcome::Created {
                    result_id: created.id,
                })
            }
            Err(RetryError { error, attempts }) => Err(ItemError::Operation {
                message: error.to_string(),
                attempts,
            }),
        }
    }
}

/// Per-row retry reporting: a log line, the bus event, then any extra observer.
struct ItemRetryObserver {
    row_index: u64,
    source_id: String,
    events: Option<EventBusRetryObserver>,
    extra: Option<Arc<dyn RetryObserver>>,
}

impl RetryObserver for ItemRetryObserver {
    fn on_retry(&self, notice: &RetryNotice<'_>) {
        warn!(
            row = self.row_index,
            source_id = %self.source_id,
            attempt = notice.attempt,
            max_attempts = notice.max_attempts,
            delay_ms = notice.delay.as_millis() as u64,
            error = notice.error,
            "Shortcut create failed, retrying"
        );
        if let Some(events) = &self.events {
            events.on_retry(notice);
        }
        if let Some(extra) = &self.extra {
            extra.on_retry(notice);
        }
    }
}
