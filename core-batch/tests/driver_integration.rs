//! Integration tests for the batch driver against an in-memory Drive

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::storage::{ChildPage, RemoteFile, StorageProvider, SHORTCUT_MIME_TYPE};
use core_batch::{
    BatchDriver, BatchError, CursorStore, FailureRecord, JsonFileCursorStore, ResultReporter,
    RetryNotice, RetryPolicy, RunSummary, WorkItem, WorklistSource, UNRESOLVED_NAME,
};
use core_runtime::config::ShortcutJobConfig;
use core_runtime::events::{BatchEvent, CoreEvent, EventBus};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// In-memory Drive with scripted failures and call accounting.
#[derive(Default)]
struct FakeDrive {
    existing: Mutex<HashSet<(String, String)>>,
    names: HashMap<String, String>,
    /// Statuses returned by successive create calls for a source id
    create_failures: Mutex<HashMap<String, VecDeque<u16>>>,
    /// Containers whose existence check errors
    broken_containers: HashSet<String>,
    latency: Duration,

    exists_calls: AtomicUsize,
    create_calls: AtomicUsize,
    name_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeDrive {
    fn with_existing(self, container: &str, name: &str) -> Self {
        self.existing
            .lock()
            .unwrap()
            .insert((container.to_string(), name.to_string()));
        self
    }

    fn with_name(mut self, id: &str, name: &str) -> Self {
        self.names.insert(id.to_string(), name.to_string());
        self
    }

    fn with_create_failures(self, source: &str, statuses: &[u16]) -> Self {
        self.create_failures
            .lock()
            .unwrap()
            .insert(source.to_string(), statuses.iter().copied().collect());
        self
    }

    fn with_broken_container(mut self, container: &str) -> Self {
        self.broken_containers.insert(container.to_string());
        self
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn contains(&self, container: &str, name: &str) -> bool {
        self.existing
            .lock()
            .unwrap()
            .contains(&(container.to_string(), name.to_string()))
    }

    async fn call(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageProvider for FakeDrive {
    async fn exists(&self, container_id: &str, name: &str) -> BridgeResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.call().await;
        if self.broken_containers.contains(container_id) {
            return Err(BridgeError::Http {
                status: 500,
                message: "backendError".into(),
            });
        }
        Ok(self.contains(container_id, name))
    }

    async fn create_shortcut(
        &self,
        target_id: &str,
        container_id: &str,
        name: &str,
    ) -> BridgeResult<RemoteFile> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.call().await;

        let scripted = self
            .create_failures
            .lock()
            .unwrap()
            .get_mut(target_id)
            .and_then(VecDeque::pop_front);
        if let Some(status) = scripted {
            return Err(BridgeError::Http {
                status,
                message: format!("scripted {}", status),
            });
        }

        self.existing
            .lock()
            .unwrap()
            .insert((container_id.to_string(), name.to_string()));
        Ok(RemoteFile {
            id: format!("shortcut-{}", target_id),
            name: name.to_string(),
            mime_type: Some(SHORTCUT_MIME_TYPE.to_string()),
            size: None,
            parent_ids: vec![container_id.to_string()],
        })
    }

    async fn get_name(&self, file_id: &str) -> BridgeResult<String> {
        self.name_calls.fetch_add(1, Ordering::SeqCst);
        self.call().await;
        self.names
            .get(file_id)
            .cloned()
            .ok_or_else(|| BridgeError::Http {
                status: 404,
                message: format!("File not found: {}", file_id),
            })
    }

    async fn list_children(
        &self,
        _folder_id: &str,
        _page_token: Option<&str>,
    ) -> BridgeResult<ChildPage> {
        Ok(ChildPage::default())
    }
}

struct VecSource(Vec<WorkItem>);

#[async_trait]
impl WorklistSource for VecSource {
    async fn read_all(&self) -> core_batch::Result<Vec<WorkItem>> {
        Ok(self.0.clone())
    }
}

struct MissingSource;

#[async_trait]
impl WorklistSource for MissingSource {
    async fn read_all(&self) -> core_batch::Result<Vec<WorkItem>> {
        Err(BatchError::Source("sheet 'Sheet1' not found".into()))
    }
}

#[derive(Default)]
struct RecordingReporter {
    written: Mutex<Vec<Vec<FailureRecord>>>,
    printed: Mutex<Vec<RunSummary>>,
}

#[async_trait]
impl ResultReporter for RecordingReporter {
    async fn write_failures(&self, failures: &[FailureRecord]) -> core_batch::Result<()> {
        self.written.lock().unwrap().push(failures.to_vec());
        Ok(())
    }

    fn print_summary(&self, summary: &RunSummary) {
        self.printed.lock().unwrap().push(*summary);
    }
}

/// Reporter whose failure file cannot be written.
#[derive(Default)]
struct LockedReporter {
    printed: Mutex<Vec<RunSummary>>,
}

#[async_trait]
impl ResultReporter for LockedReporter {
    async fn write_failures(&self, _failures: &[FailureRecord]) -> core_batch::Result<()> {
        Err(BatchError::Report("failed_shortcuts.xlsx is locked".into()))
    }

    fn print_summary(&self, summary: &RunSummary) {
        self.printed.lock().unwrap().push(*summary);
    }
}

fn item(row: u64, source: &str, container: &str, name: &str) -> WorkItem {
    WorkItem::new(row, source, container).with_display_name(name)
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(5, Duration::from_millis(1), 2.0)
}

fn driver(drive: &Arc<FakeDrive>, config: &ShortcutJobConfig) -> BatchDriver {
    BatchDriver::new(drive.clone(), config)
        .unwrap()
        .with_retry_policy(fast_policy())
}

fn summary(succeeded: u64, skipped_existing: u64, skipped_invalid: u64, failed: u64) -> RunSummary {
    RunSummary {
        succeeded,
        skipped_existing,
        skipped_invalid,
        failed,
    }
}

#[tokio::test]
async fn test_mixed_worklist() {
    let drive = Arc::new(FakeDrive::default().with_existing("X", "a.txt"));
    let reporter = RecordingReporter::default();
    let source = VecSource(vec![
        item(2, "A", "X", "a.txt"),
        WorkItem::new(3, "", "Y"),
        item(4, "B", "X", "b.txt"),
    ]);

    let report = driver(&drive, &ShortcutJobConfig::default())
        .run_and_report(&source, &reporter)
        .await
        .unwrap();

    assert_eq!(report.summary, summary(1, 1, 1, 0));
    assert!(report.failures.is_empty());
    assert_eq!(drive.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(drive.exists_calls.load(Ordering::SeqCst), 2);
    assert!(drive.contains("X", "b.txt"));

    assert!(reporter.written.lock().unwrap().is_empty());
    assert_eq!(*reporter.printed.lock().unwrap(), vec![summary(1, 1, 1, 0)]);
}

#[tokio::test]
async fn test_invalid_rows_never_reach_the_service() {
    let drive = Arc::new(FakeDrive::default());
    let items = vec![
        item(2, "", "X", "a"),
        item(3, "B", "", "b"),
        item(4, " ", "\t", "c"),
    ];

    let report = driver(&drive, &ShortcutJobConfig::default())
        .run(items)
        .await
        .unwrap();

    assert_eq!(report.summary, summary(0, 0, 3, 0));
    assert_eq!(drive.exists_calls.load(Ordering::SeqCst), 0);
    assert_eq!(drive.create_calls.load(Ordering::SeqCst), 0);
    assert_eq!(drive.name_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_worklist() {
    let drive = Arc::new(FakeDrive::default());
    let reporter = RecordingReporter::default();

    let report = driver(&drive, &ShortcutJobConfig::default())
        .run_and_report(&VecSource(Vec::new()), &reporter)
        .await
        .unwrap();

    assert_eq!(report.summary, RunSummary::default());
    assert_eq!(report.chunks_processed, 0);
    assert!(reporter.written.lock().unwrap().is_empty());
    assert_eq!(reporter.printed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_rerun_skips_everything_already_created() {
    let drive = Arc::new(FakeDrive::default());
    let items: Vec<_> = (0..10)
        .map(|i| item(i + 2, &format!("src-{}", i), "dest", &format!("file-{}.txt", i)))
        .collect();
    let driver = driver(&drive, &ShortcutJobConfig::default().with_chunk_size(3));

    let first = driver.run(items.clone()).await.unwrap();
    assert_eq!(first.summary, summary(10, 0, 0, 0));

    let second = driver.run(items).await.unwrap();
    assert_eq!(second.summary, summary(0, 10, 0, 0));
    assert_eq!(drive.create_calls.load(Ordering::SeqCst), 10);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_then_success() {
    let drive = Arc::new(FakeDrive::default().with_create_failures("A", &[503, 503, 429, 500]));
    let notices = Arc::new(Mutex::new(Vec::new()));
    let recorded = notices.clone();

    let driver = BatchDriver::new(drive.clone(), &ShortcutJobConfig::default())
        .unwrap()
        .with_retry_observer(Arc::new(move |n: &RetryNotice<'_>| {
            recorded.lock().unwrap().push(n.attempt)
        }));

    let start = Instant::now();
    let report = driver.run(vec![item(2, "A", "X", "a.txt")]).await.unwrap();

    assert_eq!(report.summary, summary(1, 0, 0, 0));
    assert_eq!(drive.create_calls.load(Ordering::SeqCst), 5);
    assert_eq!(*notices.lock().unwrap(), vec![1, 2, 3, 4]);
    // 1s + 2s + 4s + 8s of backoff
    assert!(start.elapsed() >= Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_land_in_ledger_once() {
    let drive = Arc::new(FakeDrive::default().with_create_failures("A", &[503; 6]));
    let reporter = RecordingReporter::default();
    let source = VecSource(vec![item(2, "A", "X", "a.txt"), item(3, "B", "X", "b.txt")]);

    let report = BatchDriver::new(drive.clone(), &ShortcutJobConfig::default())
        .unwrap()
        .run_and_report(&source, &reporter)
        .await
        .unwrap();

    assert_eq!(report.summary, summary(1, 0, 0, 1));
    assert_eq!(drive.create_calls.load(Ordering::SeqCst), 6);

    let written = reporter.written.lock().unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].len(), 1);
    let failure = &written[0][0];
    assert_eq!(failure.row_index, 2);
    assert_eq!(failure.source_id, "A");
    assert_eq!(failure.display_name, "a.txt");
    assert!(failure.error.contains("5 attempt"), "{}", failure.error);
    assert!(failure.error.contains("503"), "{}", failure.error);
}

#[tokio::test]
async fn test_permanent_error_makes_one_attempt() {
    let drive = Arc::new(FakeDrive::default().with_create_failures("A", &[404]));

    let report = driver(&drive, &ShortcutJobConfig::default())
        .run(vec![item(2, "A", "X", "a.txt")])
        .await
        .unwrap();

    assert_eq!(report.summary, summary(0, 0, 0, 1));
    assert_eq!(drive.create_calls.load(Ordering::SeqCst), 1);
    assert!(report.failures[0].error.contains("1 attempt"));
}

#[tokio::test]
async fn test_existence_check_failure_is_not_retried() {
    let drive = Arc::new(FakeDrive::default().with_broken_container("X"));
    let observed = Arc::new(AtomicUsize::new(0));
    let counter = observed.clone();

    let report = driver(&drive, &ShortcutJobConfig::default())
        .with_retry_observer(Arc::new(move |_: &RetryNotice<'_>| {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .run(vec![item(2, "A", "X", "a.txt"), item(3, "B", "Y", "b.txt")])
        .await
        .unwrap();

    assert_eq!(report.summary, summary(1, 0, 0, 1));
    assert_eq!(drive.exists_calls.load(Ordering::SeqCst), 2);
    assert_eq!(drive.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(observed.load(Ordering::SeqCst), 0);
    assert!(report.failures[0].error.contains("existence check failed"));
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_calls_never_exceed_cap() {
    let drive = Arc::new(FakeDrive::default().with_latency(Duration::from_millis(50)));
    let items: Vec<_> = (0..40)
        .map(|i| item(i + 2, &format!("src-{}", i), "dest", &format!("f{}", i)))
        .collect();
    let config = ShortcutJobConfig::default().with_max_concurrent(4);

    let report = driver(&drive, &config).run(items).await.unwrap();

    assert_eq!(report.summary, summary(40, 0, 0, 0));
    assert_eq!(drive.peak.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_missing_name_is_looked_up() {
    let drive = Arc::new(FakeDrive::default().with_name("A", "report.pdf"));
    let items = vec![
        WorkItem::new(2, "A", "X"),
        WorkItem::new(3, "B", "X").with_display_name("  "),
    ];

    let report = driver(&drive, &ShortcutJobConfig::default())
        .run(items)
        .await
        .unwrap();

    assert_eq!(report.summary, summary(1, 0, 0, 1));
    assert!(drive.contains("X", "report.pdf"));
    assert_eq!(drive.name_calls.load(Ordering::SeqCst), 2);

    let failure = &report.failures[0];
    assert_eq!(failure.row_index, 3);
    assert_eq!(failure.display_name, UNRESOLVED_NAME);
    assert!(failure.error.contains("name lookup failed"));
}

#[tokio::test]
async fn test_start_row_skips_leading_rows() {
    let drive = Arc::new(FakeDrive::default());
    let items: Vec<_> = (0..5)
        .map(|i| item(i + 2, &format!("s{}", i), "dest", &format!("n{}", i)))
        .collect();

    let report = driver(&drive, &ShortcutJobConfig::default().with_start_row(5))
        .run(items)
        .await
        .unwrap();

    assert_eq!(report.skipped_before_start, 3);
    assert_eq!(report.summary, summary(2, 0, 0, 0));
    assert!(!drive.contains("dest", "n0"));
    assert!(drive.contains("dest", "n4"));
}

#[tokio::test]
async fn test_start_row_is_a_sheet_row_number() {
    let drive = Arc::new(FakeDrive::default());
    // Sheet row 4 was blank and never reached the worklist.
    let items = vec![
        item(2, "s0", "dest", "n0"),
        item(3, "s1", "dest", "n1"),
        item(5, "s3", "dest", "n3"),
        item(6, "s4", "dest", "n4"),
    ];

    let report = driver(&drive, &ShortcutJobConfig::default().with_start_row(5))
        .run(items)
        .await
        .unwrap();

    assert_eq!(report.skipped_before_start, 2);
    assert_eq!(report.summary, summary(2, 0, 0, 0));
    assert!(!drive.contains("dest", "n1"));
    assert!(drive.contains("dest", "n3"));
}

#[tokio::test]
async fn test_resume_cursor_skips_settled_rows_and_clears_on_success() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("progress.json");
    let cursor = JsonFileCursorStore::new(&path);
    cursor.save(3).await.unwrap();

    let drive = Arc::new(FakeDrive::default());
    let items: Vec<_> = (0..4)
        .map(|i| item(i + 2, &format!("s{}", i), "dest", &format!("n{}", i)))
        .collect();
    let config = ShortcutJobConfig::default().with_resume_cursor_path(&path);

    let report = driver(&drive, &config).run(items).await.unwrap();

    assert_eq!(report.skipped_before_start, 2);
    assert_eq!(report.summary, summary(2, 0, 0, 0));
    assert_eq!(cursor.load().await.unwrap(), None);
}

#[tokio::test]
async fn test_resume_cursor_stops_before_failed_row() {
    let dir = tempfile::tempdir().unwrap();
    let cursor = Arc::new(JsonFileCursorStore::new(dir.path().join("progress.json")));

    let drive = Arc::new(FakeDrive::default().with_create_failures("s1", &[400]));
    let items: Vec<_> = (0..5)
        .map(|i| item(i + 2, &format!("s{}", i), "dest", &format!("n{}", i)))
        .collect();
    let config = ShortcutJobConfig::default().with_chunk_size(2);

    let first = driver(&drive, &config)
        .with_cursor_store(cursor.clone())
        .run(items.clone())
        .await
        .unwrap();

    assert_eq!(first.chunks_processed, 3);
    assert_eq!(first.summary, summary(4, 0, 0, 1));
    assert_eq!(cursor.load().await.unwrap(), Some(2));

    // The rerun picks the failed row up again; rows after it are already there.
    let second = driver(&drive, &config)
        .with_cursor_store(cursor.clone())
        .run(items)
        .await
        .unwrap();

    assert_eq!(second.skipped_before_start, 1);
    assert_eq!(second.summary, summary(1, 3, 0, 0));
    assert!(drive.contains("dest", "n1"));
    assert_eq!(cursor.load().await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_interrupted_run_retries_failed_row_on_resume() {
    let dir = tempfile::tempdir().unwrap();
    let cursor = Arc::new(JsonFileCursorStore::new(dir.path().join("progress.json")));

    let drive = Arc::new(
        FakeDrive::default()
            .with_latency(Duration::from_millis(100))
            .with_create_failures("s1", &[400]),
    );
    let items: Vec<_> = (0..5)
        .map(|i| item(i + 2, &format!("s{}", i), "dest", &format!("n{}", i)))
        .collect();
    let config = ShortcutJobConfig::default().with_chunk_size(1);

    // Each row takes 200ms; stop while row 5 is still in flight.
    let interrupted = tokio::time::timeout(
        Duration::from_millis(650),
        driver(&drive, &config)
            .with_cursor_store(cursor.clone())
            .run(items.clone()),
    )
    .await;
    assert!(interrupted.is_err());
    assert!(!drive.contains("dest", "n1"));
    assert_eq!(cursor.load().await.unwrap(), Some(2));

    let resumed = driver(&drive, &config)
        .with_cursor_store(cursor.clone())
        .run(items)
        .await
        .unwrap();

    assert_eq!(resumed.skipped_before_start, 1);
    assert_eq!(resumed.summary.total(), 4);
    assert_eq!(resumed.summary.failed, 0);
    assert!(resumed.failures.is_empty());
    assert!(drive.contains("dest", "n1"));
    assert_eq!(cursor.load().await.unwrap(), None);
}

#[tokio::test]
async fn test_chunk_size_does_not_change_results() {
    let build = || {
        Arc::new(
            FakeDrive::default()
                .with_existing("dest", "n3")
                .with_create_failures("s5", &[404]),
        )
    };
    let items: Vec<_> = (0..8)
        .map(|i| item(i + 2, &format!("s{}", i), "dest", &format!("n{}", i)))
        .chain(std::iter::once(item(10, "", "dest", "blank")))
        .collect();

    let one = driver(&build(), &ShortcutJobConfig::default().with_chunk_size(1))
        .run(items.clone())
        .await
        .unwrap();
    let all = driver(&build(), &ShortcutJobConfig::default().with_chunk_size(100))
        .run(items)
        .await
        .unwrap();

    assert_eq!(one.summary, summary(6, 1, 1, 1));
    assert_eq!(one.summary, all.summary);
    assert_eq!(one.failures, all.failures);
    assert_eq!(one.chunks_processed, 9);
    assert_eq!(all.chunks_processed, 1);
    assert_eq!(one.summary.total(), 9);
}

#[tokio::test]
async fn test_progress_events() {
    let bus = EventBus::new(256);
    let mut rx = bus.subscribe();
    let drive = Arc::new(FakeDrive::default().with_create_failures("s1", &[503, 403]));
    let items: Vec<_> = (0..5)
        .map(|i| item(i + 2, &format!("s{}", i), "dest", &format!("n{}", i)))
        .collect();

    let report = driver(&drive, &ShortcutJobConfig::default().with_chunk_size(2))
        .with_event_bus(bus)
        .run(items)
        .await
        .unwrap();
    assert_eq!(report.summary, summary(4, 0, 0, 1));

    let mut events = Vec::new();
    while let Ok(CoreEvent::Batch(event)) = rx.try_recv() {
        events.push(event);
    }

    let count = |f: fn(&BatchEvent) -> bool| events.iter().filter(|e| f(e)).count();
    assert_eq!(count(|e| matches!(e, BatchEvent::RunStarted { total_items: 5 })), 1);
    assert_eq!(count(|e| matches!(e, BatchEvent::ChunkCompleted { .. })), 3);
    assert_eq!(
        count(|e| matches!(e, BatchEvent::RetryScheduled { row_index: 3, attempt: 1, .. })),
        1
    );
    assert_eq!(count(|e| matches!(e, BatchEvent::ItemFailed { row_index: 3, .. })), 1);
    assert!(matches!(
        events.last(),
        Some(BatchEvent::RunCompleted {
            succeeded: 4,
            failed: 1,
            ..
        })
    ));
}

#[tokio::test]
async fn test_summary_printed_when_failure_report_cannot_be_written() {
    let drive = Arc::new(FakeDrive::default().with_create_failures("B", &[404]));
    let reporter = LockedReporter::default();
    let source = VecSource(vec![item(2, "A", "X", "a.txt"), item(3, "B", "X", "b.txt")]);

    let err = driver(&drive, &ShortcutJobConfig::default())
        .run_and_report(&source, &reporter)
        .await
        .unwrap_err();

    assert!(matches!(err, BatchError::Report(_)));
    assert_eq!(*reporter.printed.lock().unwrap(), vec![summary(1, 0, 0, 1)]);
}

#[tokio::test]
async fn test_unreadable_worklist_is_a_setup_error() {
    let drive = Arc::new(FakeDrive::default());
    let reporter = RecordingReporter::default();

    let err = driver(&drive, &ShortcutJobConfig::default())
        .run_and_report(&MissingSource, &reporter)
        .await
        .unwrap_err();

    assert!(matches!(err, BatchError::Source(_)));
    assert!(reporter.printed.lock().unwrap().is_empty());
}

#[test]
fn test_rejects_zero_sizes() {
    let drive: Arc<dyn StorageProvider> = Arc::new(FakeDrive::default());

    for config in [
        ShortcutJobConfig::default().with_chunk_size(0),
        ShortcutJobConfig::default().with_max_concurrent(0),
        ShortcutJobConfig::default().with_max_attempts(0),
    ] {
        assert!(matches!(
            BatchDriver::new(drive.clone(), &config),
            Err(BatchError::Config(_))
        ));
    }
}
