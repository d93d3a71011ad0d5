//! # Folder Walker
//!
//! Lists a folder tree depth-first, pre-order. Each listing page is handled
//! in two passes: sub-folders first (each one emitted, then walked), then
//! the page's files when file rows are enabled. Pages arrive sorted by name.
//!
//! Listing calls go through a [`RetryPolicy`]. A folder that still cannot be
//! listed aborts the walk.

use bridge_traits::storage::{ChildPage, RemoteFile, StorageProvider};
use core_batch::{LoggingRetryObserver, RetryPolicy};
use core_runtime::config::InventoryConfig;
use core_runtime::events::{CoreEvent, EventBus, InventoryEvent};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{InventoryError, Result};
use crate::types::{join_path, InventoryRow, InventorySink, InventorySummary};

pub struct FolderInventory {
    provider: Arc<dyn StorageProvider>,
    policy: RetryPolicy,
    include_files: bool,
    mime_prefix: Option<String>,
    events: Option<EventBus>,
}

impl FolderInventory {
    pub fn new(provider: Arc<dyn StorageProvider>, config: &InventoryConfig) -> Self {
        Self {
            provider,
            policy: RetryPolicy::default(),
            include_files: config.include_files,
            mime_prefix: config.mime_prefix.clone(),
            events: None,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Walk everything below `root_folder_id`. The root itself is not listed.
    pub async fn walk(&self, root_folder_id: &str) -> Result<Vec<InventoryRow>> {
        if root_folder_id.trim().is_empty() {
            return Err(InventoryError::Config("root folder id is empty".into()));
        }

        info!(root = %root_folder_id, "Starting to scan folder");
        let mut walk = Walk {
            rows: Vec::new(),
            visited: HashSet::from([root_folder_id.to_string()]),
        };
        self.walk_folder(root_folder_id.to_string(), String::new(), &mut walk)
            .await?;

        let summary = InventorySummary::from_rows(&walk.rows);
        info!(folders = summary.folders, files = summary.files, "Folder scan finished");
        self.emit(InventoryEvent::Completed {
            folders: summary.folders,
            files: summary.files,
        });

        Ok(walk.rows)
    }

    /// Walk the tree and hand the rows to `sink`.
    pub async fn walk_into(
        &self,
        root_folder_id: &str,
        sink: &dyn InventorySink,
    ) -> Result<InventorySummary> {
        let rows = self.walk(root_folder_id).await?;
        sink.write_rows(&rows).await?;
        Ok(InventorySummary::from_rows(&rows))
    }

    fn walk_folder<'a>(
        &'a self,
        folder_id: String,
        path: String,
        walk: &'a mut Walk,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let mut page_token: Option<String> = None;
            loop {
                let page = self.list_page(&folder_id, page_token.as_deref()).await?;
                let (folders, files): (Vec<RemoteFile>, Vec<RemoteFile>) =
                    page.files.into_iter().partition(RemoteFile::is_folder);

                for folder in folders {
                    if !walk.visited.insert(folder.id.clone()) {
                        warn!(folder_id = %folder.id, name = %folder.name, "Folder already listed, not descending again");
                        continue;
                    }

                    let child_path = join_path(&path, &folder.name);
                    let child_id = folder.id.clone();
                    walk.rows.push(to_row(&path, folder));

                    info!(path = %child_path, "Entering folder");
                    self.emit(InventoryEvent::FolderEntered {
                        path: child_path.clone(),
                    });
                    self.walk_folder(child_id, child_path, walk).await?;
                }

                if self.include_files {
                    walk.rows.extend(
                        files
                            .into_iter()
                            .filter(|file| self.wants(file))
                            .map(|file| to_row(&path, file)),
                    );
                }

                page_token = page.next_page_token;
                if page_token.is_none() {
                    break;
                }
            }
            Ok(())
        }
        .boxed()
    }

    async fn list_page(&self, folder_id: &str, page_token: Option<&str>) -> Result<ChildPage> {
        debug!(folder_id, page_token = ?page_token, "Listing folder page");
        let observer = LoggingRetryObserver::new(format!("list folder {}", folder_id));
        self.policy
            .run(
                |_| self.provider.list_children(folder_id, page_token),
                &observer,
            )
            .await
            .map_err(|e| InventoryError::Listing {
                folder_id: folder_id.to_string(),
                message: e.to_string(),
            })
    }

    fn wants(&self, file: &RemoteFile) -> bool {
        match &self.mime_prefix {
            Some(prefix) => file
                .mime_type
                .as_deref()
                .map_or(false, |mime| mime.starts_with(prefix.as_str())),
            None => true,
        }
    }

    fn emit(&self, event: InventoryEvent) {
        if let Some(bus) = &self.events {
            let _ = bus.emit(CoreEvent::Inventory(event));
        }
    }
}

struct Walk {
    rows: Vec<InventoryRow>,
    visited: HashSet<String>,
}

fn to_row(parent_path: &str, file: RemoteFile) -> InventoryRow {
    let is_folder = file.is_folder();
    InventoryRow {
        parent_path: parent_path.to_string(),
        name: file.name,
        id: file.id,
        size: file.size,
        mime_type: file.mime_type,
        is_folder,
    }
}
