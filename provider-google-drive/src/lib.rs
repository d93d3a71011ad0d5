//! # Google Drive Provider
//!
//! Implements `StorageProvider` for Google Drive API v3.
//!
//! ## Overview
//!
//! This crate provides:
//! - Duplicate checks by exact (folder, name) match, ignoring trashed items
//! - Shortcut creation
//! - Name lookup for a file id
//! - Paged, name-ordered folder listing for the inventory walker
//!
//! Retrying is left to the caller; every call is a single attempt.

pub mod connector;
pub mod error;
pub mod query;
pub mod types;

pub use connector::GoogleDriveConnector;
pub use error::{GoogleDriveError, Result};
pub use query::escape_query_value;
