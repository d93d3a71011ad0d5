//! # Job Configuration
//!
//! Configuration for the shortcut-creation and folder-inventory jobs.
//!
//! ## Overview
//!
//! Both binaries take no command-line arguments. Their behavior comes from a
//! single JSON document that is deserialized into [`AppConfig`]. Every section
//! and field has a default, so a config file only needs the values that
//! differ. [`AppConfig::validate`] fails fast with actionable messages before
//! any credential or network work happens.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::AppConfig;
//!
//! let config = AppConfig::load_from_env_or_default()?;
//! config.validate()?;
//! println!("Reading {}", config.shortcuts.excel_path.display());
//! ```
//!
//! ## Example file
//!
//! ```json
//! {
//!   "auth": { "credentials_path": "credentials.json", "token_path": "token.json" },
//!   "shortcuts": {
//!     "excel_path": "worklist.xlsx",
//!     "sheet_name": "Sheet1",
//!     "columns": { "file_id": "File ID", "folder_id": "Folder ID", "file_name": "File Name" },
//!     "max_concurrent": 100,
//!     "max_attempts": 5
//!   },
//!   "inventory": { "root_folder_id": "17Ds...", "output_path": "FolderList.xlsx" },
//!   "logging": { "format": "compact", "level": "info" }
//! }
//! ```

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "DRIVE_SHORTCUTS_CONFIG";

/// Config file looked up in the working directory when the variable is unset.
pub const DEFAULT_CONFIG_FILE: &str = "drive-shortcuts.json";

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub shortcuts: ShortcutJobConfig,
    pub inventory: InventoryConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Parse a config document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("Invalid config JSON: {}", e)))
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| Error::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Location of the config file: `$DRIVE_SHORTCUTS_CONFIG` or
    /// `./drive-shortcuts.json`.
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    pub fn load_from_env_or_default() -> Result<Self> {
        Self::load(&Self::default_path())
    }

    /// Validates the sections needed by the shortcut job.
    pub fn validate(&self) -> Result<()> {
        self.auth.validate()?;
        self.shortcuts.validate()
    }

    /// Validates the sections needed by the folder inventory job.
    pub fn validate_inventory(&self) -> Result<()> {
        self.auth.validate()?;
        self.inventory.validate()
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_shortcuts(mut self, shortcuts: ShortcutJobConfig) -> Self {
        self.shortcuts = shortcuts;
        self
    }

    pub fn with_inventory(mut self, inventory: InventoryConfig) -> Self {
        self.inventory = inventory;
        self
    }

    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }
}

/// OAuth client secrets and token cache locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Installed-app client secrets downloaded from the cloud console
    pub credentials_path: PathBuf,
    /// Token cache file; created after the first interactive authorization
    pub token_path: PathBuf,
    /// Overrides the job's default scopes when set
    pub scopes: Option<Vec<String>>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("credentials.json"),
            token_path: PathBuf::from("token.json"),
            scopes: None,
        }
    }
}

impl AuthConfig {
    pub fn validate(&self) -> Result<()> {
        if self.credentials_path.as_os_str().is_empty() {
            return Err(Error::Config(
                "auth.credentials_path cannot be empty".to_string(),
            ));
        }
        if self.token_path.file_name().is_none() {
            return Err(Error::Config(
                "auth.token_path must name a file, e.g. \"token.json\"".to_string(),
            ));
        }
        if let Some(scopes) = &self.scopes {
            if scopes.is_empty() || scopes.iter().any(|s| s.trim().is_empty()) {
                return Err(Error::Config(
                    "auth.scopes must list at least one non-empty scope".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Worksheet column headers the worklist is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub file_id: String,
    pub folder_id: String,
    /// Optional; when absent the source file's own name is looked up.
    pub file_name: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            file_id: "File ID".to_string(),
            folder_id: "Folder ID".to_string(),
            file_name: Some("File Name".to_string()),
        }
    }
}

/// Settings for the bulk shortcut job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortcutJobConfig {
    pub excel_path: PathBuf,
    pub sheet_name: String,
    pub columns: ColumnMapping,

    /// Where permanently failed rows are written
    pub failure_report_path: PathBuf,
    pub failure_sheet_name: String,

    /// Rows per settle-all batch
    pub chunk_size: usize,
    /// Maximum in-flight remote calls
    pub max_concurrent: usize,
    /// Attempts for the create call, including the first
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
    /// Upper bound for a single backoff sleep
    pub max_delay_ms: u64,

    /// First sheet row to process (1-based, as shown in the spreadsheet);
    /// earlier rows are skipped. 0 processes every row.
    pub start_row: usize,
    /// Progress file; rows at or below the saved row are skipped on restart.
    /// It never moves past a failed row.
    pub resume_cursor_path: Option<PathBuf>,
}

impl Default for ShortcutJobConfig {
    fn default() -> Self {
        Self {
            excel_path: PathBuf::from("worklist.xlsx"),
            sheet_name: "Sheet1".to_string(),
            columns: ColumnMapping::default(),
            failure_report_path: PathBuf::from("failed_shortcuts.xlsx"),
            failure_sheet_name: "Failed".to_string(),
            chunk_size: 100,
            max_concurrent: 100,
            max_attempts: 5,
            base_delay_ms: 1000,
            backoff_factor: 2.0,
            max_delay_ms: 60_000,
            start_row: 0,
            resume_cursor_path: None,
        }
    }
}

impl ShortcutJobConfig {
    pub fn with_excel_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.excel_path = path.into();
        self
    }

    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }

    pub fn with_columns(mut self, columns: ColumnMapping) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    pub fn with_backoff_factor(mut self, backoff_factor: f64) -> Self {
        self.backoff_factor = backoff_factor;
        self
    }

    pub fn with_start_row(mut self, start_row: usize) -> Self {
        self.start_row = start_row;
        self
    }

    pub fn with_resume_cursor_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.resume_cursor_path = Some(path.into());
        self
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.excel_path.as_os_str().is_empty() {
            return Err(Error::Config(
                "shortcuts.excel_path cannot be empty".to_string(),
            ));
        }
        if self.sheet_name.trim().is_empty() {
            return Err(Error::Config(
                "shortcuts.sheet_name cannot be empty".to_string(),
            ));
        }
        if self.columns.file_id.trim().is_empty() || self.columns.folder_id.trim().is_empty() {
            return Err(Error::Config(
                "shortcuts.columns.file_id and shortcuts.columns.folder_id are required"
                    .to_string(),
            ));
        }
        if matches!(&self.columns.file_name, Some(name) if name.trim().is_empty()) {
            return Err(Error::Config(
                "shortcuts.columns.file_name must be omitted or non-empty".to_string(),
            ));
        }
        if self.failure_report_path.as_os_str().is_empty() {
            return Err(Error::Config(
                "shortcuts.failure_report_path cannot be empty".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(Error::Config(
                "shortcuts.chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.max_concurrent == 0 {
            return Err(Error::Config(
                "shortcuts.max_concurrent must be greater than 0".to_string(),
            ));
        }
        if self.max_concurrent > 1000 {
            return Err(Error::Config(
                "shortcuts.max_concurrent exceeds maximum of 1000".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config(
                "shortcuts.max_attempts must be at least 1".to_string(),
            ));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(Error::Config(
                "shortcuts.backoff_factor must be a finite number >= 1.0".to_string(),
            ));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(Error::Config(
                "shortcuts.max_delay_ms must not be smaller than shortcuts.base_delay_ms"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings for the folder inventory job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub root_folder_id: String,
    pub output_path: PathBuf,
    pub sheet_name: String,
    /// Also list the files inside each folder
    pub include_files: bool,
    /// Only list files whose MIME type starts with this prefix (e.g. "image/")
    pub mime_prefix: Option<String>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            root_folder_id: String::new(),
            output_path: PathBuf::from("FolderList.xlsx"),
            sheet_name: "FileList".to_string(),
            include_files: false,
            mime_prefix: None,
        }
    }
}

impl InventoryConfig {
    pub fn with_root_folder_id(mut self, id: impl Into<String>) -> Self {
        self.root_folder_id = id.into();
        self
    }

    pub fn with_include_files(mut self, include: bool) -> Self {
        self.include_files = include;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.root_folder_id.trim().is_empty() {
            return Err(Error::Config(
                "inventory.root_folder_id is required".to_string(),
            ));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(Error::Config(
                "inventory.output_path cannot be empty".to_string(),
            ));
        }
        if self.sheet_name.trim().is_empty() {
            return Err(Error::Config(
                "inventory.sheet_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
