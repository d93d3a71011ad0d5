//! Storage Abstractions
//!
//! Credential persistence and the remote file-storage operations the batch
//! jobs depend on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// MIME type the storage service uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// MIME type the storage service uses for shortcuts.
pub const SHORTCUT_MIME_TYPE: &str = "application/vnd.google-apps.shortcut";

/// Secure credential storage trait
///
/// Holds opaque credential blobs (OAuth token caches). The desktop
/// implementation keeps each key in its own file; other hosts may use a
/// keychain.
///
/// # Security Requirements
///
/// Implementations MUST never log or expose stored values.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SecureStore;
///
/// async fn store_token(store: &dyn SecureStore, token: &str) -> Result<()> {
///     store.set_secret("oauth_token", token.as_bytes()).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret value, replacing any previous value under `key`.
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret value
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret. Deleting a missing key is not an error.
    async fn delete_secret(&self, key: &str) -> Result<()>;

    /// Check if a secret exists without retrieving it
    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }
}

/// A file or folder as reported by the remote storage service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
    pub parent_ids: Vec<String>,
}

impl RemoteFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }
}

/// One page of a folder listing.
#[derive(Debug, Clone, Default)]
pub struct ChildPage {
    pub files: Vec<RemoteFile>,
    pub next_page_token: Option<String>,
}

/// Remote storage operations
///
/// Every call may fail transiently (throttling, 5xx, transport) or
/// permanently; see [`BridgeError::is_transient`](crate::error::BridgeError::is_transient).
/// Implementations perform a single attempt per call.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Whether a non-trashed item named exactly `name` exists directly under
    /// `container_id`. The match is case-sensitive.
    async fn exists(&self, container_id: &str, name: &str) -> Result<bool>;

    /// Create a shortcut to `target_id` inside `container_id`.
    async fn create_shortcut(
        &self,
        target_id: &str,
        container_id: &str,
        name: &str,
    ) -> Result<RemoteFile>;

    /// Fetch the display name of an item.
    async fn get_name(&self, file_id: &str) -> Result<String>;

    /// List one page of the non-trashed children of `folder_id`, ordered by name.
    async fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> Result<ChildPage>;
}
