//! File-backed credential storage
//!
//! Stores each secret as its own file inside a directory. This mirrors the
//! classic "token.json next to credentials.json" layout of installed-app
//! OAuth tools, so an existing cache file can be reused by pointing the
//! store at its directory and using the file name as the key.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File-per-key secure storage implementation
///
/// Values are written to a temporary sibling file and renamed into place, so
/// an interrupted write never leaves a truncated token cache behind. On Unix
/// the file is created with mode `0600`.
pub struct FileSecureStore {
    root: PathBuf,
}

impl FileSecureStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to its file path. Keys are plain file names.
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\'])
            && !key.contains('\0');
        if !valid {
            return Err(BridgeError::OperationFailed(format!(
                "Invalid secret key: {:?}",
                key
            )));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl SecureStore for FileSecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.root).await?;

        let tmp = self.root.join(format!(".{}.tmp", key));
        tokio::fs::write(&tmp, value).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&tmp, &path).await?;

        debug!(key = key, "Stored secret on disk");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!(key = key, "Retrieved secret from disk");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(key = key, "Secret not found on disk");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key = key, "Deleted secret from disk");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(key = key, "Secret not found (already deleted)");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
