//! Resume cursor: the highest row of the last fully settled chunk.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{BatchError, Result};

#[async_trait]
pub trait CursorStore: Send + Sync {
    async fn load(&self) -> Result<Option<u64>>;
    async fn save(&self, last_completed_row: u64) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct CursorFile {
    last_completed_row: u64,
}

/// Stores the cursor as `{ "last_completed_row": n }`.
#[derive(Debug, Clone)]
pub struct JsonFileCursorStore {
    path: PathBuf,
}

impl JsonFileCursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, action: &str, err: impl std::fmt::Display) -> BatchError {
        BatchError::Cursor(format!(
            "cannot {} {}: {}",
            action,
            self.path.display(),
            err
        ))
    }
}

#[async_trait]
impl CursorStore for JsonFileCursorStore {
    async fn load(&self) -> Result<Option<u64>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.error("read", e)),
        };

        let cursor: CursorFile =
            serde_json::from_slice(&bytes).map_err(|e| self.error("parse", e))?;
        debug!(path = %self.path.display(), row = cursor.last_completed_row, "Loaded resume cursor");
        Ok(Some(cursor.last_completed_row))
    }

    async fn save(&self, last_completed_row: u64) -> Result<()> {
        let json = serde_json::to_vec(&CursorFile { last_completed_row })
            .map_err(|e| self.error("encode", e))?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| self.error("write", e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.error("replace", e))
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.error("remove", e)),
        }
    }
}
