//! Google Drive API connector implementation
//!
//! Implements the `StorageProvider` trait for Google Drive API v3.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{AccessTokenProvider, HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::storage::{ChildPage, RemoteFile, StorageProvider};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::GoogleDriveError;
use crate::query;
use crate::types::{CreateShortcutRequest, DriveFile, FilesListResponse};

/// Google Drive API base URL
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Maximum results per page (Google Drive API limit)
const MAX_PAGE_SIZE: u32 = 1000;

/// Fields to request for listed file resources
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType,size,parents)";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Google Drive API connector
///
/// Each trait call performs exactly one HTTP exchange; retrying is the
/// caller's decision. Non-2xx responses surface as
/// [`BridgeError::Http`](bridge_traits::error::BridgeError::Http) so callers
/// can classify them.
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::GoogleDriveConnector;
/// use bridge_traits::storage::StorageProvider;
///
/// let connector = GoogleDriveConnector::new(http_client, authorizer);
/// let exists = connector.exists("folder-id", "report.pdf").await?;
/// ```
pub struct GoogleDriveConnector {
    http_client: Arc<dyn HttpClient>,
    tokens: Arc<dyn AccessTokenProvider>,
    base_url: String,
}

impl GoogleDriveConnector {
    /// Create a new Google Drive connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `tokens` - Source of bearer tokens, asked once per request
    pub fn new(http_client: Arc<dyn HttpClient>, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self {
            http_client,
            tokens,
            base_url: DRIVE_API_BASE.to_string(),
        }
    }

    /// Point the connector at another endpoint, e.g. a local emulator.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let token = self.tokens.access_token().await?;
        let request = request.bearer_token(token).timeout(REQUEST_TIMEOUT);
        let response = self.http_client.execute(request).await?;

        if response.is_success() {
            return Ok(response);
        }

        let error = GoogleDriveError::from_response(response.status, &response.body);
        warn!(status = response.status, error = %error, "Drive API request failed");
        Err(error.into())
    }

    fn parse<T: DeserializeOwned>(response: &HttpResponse, what: &str) -> Result<T> {
        serde_json::from_slice(&response.body).map_err(|e| {
            GoogleDriveError::ParseError(format!("Failed to parse {}: {}", what, e)).into()
        })
    }

    fn files_url(&self, q: &str, fields: &str, page_size: u32) -> String {
        format!(
            "{}/files?q={}&fields={}&pageSize={}",
            self.base_url,
            urlencoding::encode(q),
            urlencoding::encode(fields),
            page_size
        )
    }
}

#[async_trait]
impl StorageProvider for GoogleDriveConnector {
    #[instrument(skip(self), fields(container_id = %container_id))]
    async fn exists(&self, container_id: &str, name: &str) -> Result<bool> {
        let url = self.files_url(&query::child_named(container_id, name), "files(id)", 1);

        let response = self.send(HttpRequest::new(HttpMethod::Get, url)).await?;
        let list: FilesListResponse = Self::parse(&response, "existence check")?;

        let found = !list.files.is_empty();
        debug!(found, "Checked for existing item");
        Ok(found)
    }

    #[instrument(skip(self), fields(target_id = %target_id, container_id = %container_id))]
    async fn create_shortcut(
        &self,
        target_id: &str,
        container_id: &str,
        name: &str,
    ) -> Result<RemoteFile> {
        let url = format!("{}/files?fields=id,name,mimeType,parents", self.base_url);
        let request = HttpRequest::new(HttpMethod::Post, url)
            .json(&CreateShortcutRequest::new(target_id, container_id, name))?;

        let response = self.send(request).await?;
        let created: DriveFile = Self::parse(&response, "created shortcut")?;

        debug!(shortcut_id = %created.id, "Shortcut created");
        Ok(created.into())
    }

    #[instrument(skip(self), fields(file_id = %file_id))]
    async fn get_name(&self, file_id: &str) -> Result<String> {
        let url = format!(
            "{}/files/{}?fields=id,name",
            self.base_url,
            urlencoding::encode(file_id)
        );

        let response = self.send(HttpRequest::new(HttpMethod::Get, url)).await?;
        let file: DriveFile = Self::parse(&response, "file metadata")?;
        Ok(file.name)
    }

    #[instrument(skip(self), fields(folder_id = %folder_id))]
    async fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> Result<ChildPage> {
        let mut url = self.files_url(&query::children_of(folder_id), LIST_FIELDS, MAX_PAGE_SIZE);
        url.push_str("&orderBy=name");
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        let response = self.send(HttpRequest::new(HttpMethod::Get, url)).await?;
        let list: FilesListResponse = Self::parse(&response, "files list")?;

        debug!(
            count = list.files.len(),
            has_more = list.next_page_token.is_some(),
            "Listed folder page"
        );

        Ok(ChildPage {
            files: list.files.into_iter().map(RemoteFile::from).collect(),
            next_page_token: list.next_page_token,
        })
    }
}
