//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! - `HttpClient` using `reqwest`
//! - `SecureStore` using plain files next to the configuration, one file per
//!   key (the OAuth token cache)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FileSecureStore, ReqwestHttpClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let tokens = FileSecureStore::new("./credentials");
//!     // Hand both to the service wiring
//!     Ok(())
//! }
//! ```

mod http;
mod secure_store;

pub use http::ReqwestHttpClient;
pub use secure_store::FileSecureStore;
