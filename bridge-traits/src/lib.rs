//! # Host Bridge Traits
//!
//! Platform abstraction traits that the jobs depend on and that each host
//! must implement.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - One async HTTP exchange per call
//! - [`AccessTokenProvider`](http::AccessTokenProvider) - Bearer tokens, refreshed as needed
//! - [`SecureStore`](storage::SecureStore) - Opaque credential persistence
//! - [`StorageProvider`](storage::StorageProvider) - Remote file-storage operations
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it with actionable messages, and map
//! non-2xx service responses to [`BridgeError::Http`] so callers can tell
//! transient failures from permanent ones.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so they can be shared
//! across spawned tasks behind an `Arc`.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use http::{AccessTokenProvider, HttpClient, HttpMethod, HttpRequest, HttpResponse, StaticToken};
pub use storage::{ChildPage, RemoteFile, SecureStore, StorageProvider};
pub use time::{Clock, LogLevel, SystemClock};
