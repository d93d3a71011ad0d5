//! # Drive Shortcuts
//!
//! Bulk Google Drive shortcut creation from a spreadsheet worklist, plus a
//! folder-tree inventory export. The two binaries, `create-shortcuts` and
//! `list-folder`, take no arguments; both read `drive-shortcuts.json` (or the
//! file named by `DRIVE_SHORTCUTS_CONFIG`).
//!
//! This crate re-exports the service façade for embedding the jobs elsewhere.

pub use core_runtime::config::{AppConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE};
pub use core_service::{CoreError, CoreService, Result, StdinCodePrompt};
