//! Core service façade and bootstrap helpers.
//!
//! Wires the desktop bridges (reqwest HTTP, file token cache), the OAuth
//! authorizer and the Drive connector together, then runs one of the two
//! jobs:
//!
//! - [`CoreService::create_shortcuts`]: worklist xlsx → shortcuts, failure xlsx
//! - [`CoreService::list_folder`]: folder tree → inventory xlsx
//!
//! Every step before the first remote call is a setup step; a failure there
//! is returned as a [`CoreError`] and nothing is processed.

pub mod error;
pub mod prompt;

pub use error::{CoreError, Result};
pub use prompt::StdinCodePrompt;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridge_desktop::{FileSecureStore, ReqwestHttpClient};
use bridge_traits::http::HttpClient;
use bridge_traits::storage::StorageProvider;
use core_auth::{
    Authorizer, ClientSecrets, CodePrompt, OAuthConfig, OAuthFlowManager, TokenStore,
    DRIVE_METADATA_READONLY_SCOPE, DRIVE_SCOPE,
};
use core_batch::{BatchDriver, RunReport};
use core_inventory::{FolderInventory, InventorySummary};
use core_runtime::config::{AppConfig, AuthConfig};
use core_runtime::events::EventBus;
use core_spreadsheet::{ExcelWorklistSource, XlsxFailureReporter, XlsxInventoryWriter};
use provider_google_drive::GoogleDriveConnector;
use tracing::info;

/// Primary façade used by the binaries.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<AppConfig>,
    events: EventBus,
}

impl CoreService {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            events: EventBus::default(),
        }
    }

    /// Load the config from `$DRIVE_SHORTCUTS_CONFIG` or
    /// `./drive-shortcuts.json`.
    pub fn load() -> Result<Self> {
        Ok(Self::new(AppConfig::load_from_env_or_default()?))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Progress events published while jobs run.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Run the bulk shortcut job. Per-row failures are in the returned
    /// report, not in the error.
    pub async fn create_shortcuts(&self, prompt: &dyn CodePrompt) -> Result<RunReport> {
        self.config.validate()?;
        let job = &self.config.shortcuts;

        let provider = self.connect(prompt, DRIVE_SCOPE).await?;
        let driver = BatchDriver::new(provider, job)?.with_event_bus(self.events.clone());
        let source = ExcelWorklistSource::from_config(job);
        let reporter = XlsxFailureReporter::from_config(job);

        let report = driver.run_and_report(&source, &reporter).await?;
        info!(
            chunks = report.chunks_processed,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Shortcut job finished"
        );
        Ok(report)
    }

    /// Walk the configured root folder and write the inventory workbook.
    pub async fn list_folder(&self, prompt: &dyn CodePrompt) -> Result<InventorySummary> {
        self.config.validate_inventory()?;
        let job = &self.config.inventory;

        let provider = self.connect(prompt, DRIVE_METADATA_READONLY_SCOPE).await?;
        let writer = XlsxInventoryWriter::from_config(job);
        let summary = FolderInventory::new(provider, job)
            .with_event_bus(self.events.clone())
            .walk_into(&job.root_folder_id, &writer)
            .await?;

        info!(
            path = %writer.path().display(),
            folders = summary.folders,
            files = summary.files,
            "Excel file created"
        );
        Ok(summary)
    }

    /// Authorize and build the Drive connector.
    async fn connect(
        &self,
        prompt: &dyn CodePrompt,
        default_scope: &str,
    ) -> Result<Arc<dyn StorageProvider>> {
        let auth = &self.config.auth;
        let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new()?);

        let secrets = ClientSecrets::load(&auth.credentials_path).await?;
        let oauth = OAuthConfig::from_client_secrets(&secrets, scopes_for(auth, default_scope));
        let flow = OAuthFlowManager::new(oauth, http_client.clone());

        let (dir, key) = token_location(&auth.token_path)?;
        let token_store = TokenStore::new(Arc::new(FileSecureStore::new(dir)), key);

        let authorizer = Arc::new(
            Authorizer::new(flow, token_store).with_event_bus(self.events.clone()),
        );
        authorizer.authorize(prompt).await?;

        Ok(Arc::new(GoogleDriveConnector::new(http_client, authorizer)))
    }
}

/// Configured scopes, or the job's default.
fn scopes_for(auth: &AuthConfig, default_scope: &str) -> Vec<String> {
    auth.scopes
        .clone()
        .unwrap_or_else(|| vec![default_scope.to_string()])
}

/// Split the token cache path into the store directory and the key.
fn token_location(token_path: &Path) -> Result<(PathBuf, String)> {
    let key = token_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            CoreError::InitializationFailed(format!(
                "token path {} does not name a file",
                token_path.display()
            ))
        })?;

    let dir = match token_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_runtime::config::ShortcutJobConfig;

    #[test]
    fn test_token_location() {
        assert_eq!(
            token_location(Path::new("token.json")).unwrap(),
            (PathBuf::from("."), "token.json".to_string())
        );
        assert_eq!(
            token_location(Path::new("secrets/drive-token.json")).unwrap(),
            (PathBuf::from("secrets"), "drive-token.json".to_string())
        );
        assert!(matches!(
            token_location(Path::new("/")),
            Err(CoreError::InitializationFailed(_))
        ));
    }

    #[test]
    fn test_scopes_default_per_job() {
        let auth = AuthConfig::default();
        assert_eq!(scopes_for(&auth, DRIVE_SCOPE), vec![DRIVE_SCOPE.to_string()]);

        let custom = AuthConfig {
            scopes: Some(vec!["https://www.googleapis.com/auth/drive.file".into()]),
            ..AuthConfig::default()
        };
        assert_eq!(
            scopes_for(&custom, DRIVE_METADATA_READONLY_SCOPE),
            vec!["https://www.googleapis.com/auth/drive.file".to_string()]
        );
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_any_io() {
        let config = AppConfig::default().with_shortcuts(ShortcutJobConfig::default().with_chunk_size(0));
        let err = CoreService::new(config)
            .create_shortcuts(&StdinCodePrompt)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[tokio::test]
    async fn test_missing_credentials_is_a_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::default()
            .with_auth(AuthConfig {
                credentials_path: dir.path().join("missing-credentials.json"),
                token_path: dir.path().join("token.json"),
                scopes: None,
            })
            .with_inventory(core_runtime::config::InventoryConfig::default().with_root_folder_id("root"));

        let err = CoreService::new(config)
            .list_folder(&StdinCodePrompt)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Auth(_)));
    }
}
