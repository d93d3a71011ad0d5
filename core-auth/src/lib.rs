//! # Authentication
//!
//! OAuth 2.0 installed-app authorization against Google Drive.
//!
//! ## Overview
//!
//! - [`ClientSecrets`] parses the client credentials file from the Cloud console
//! - [`OAuthFlowManager`] builds the PKCE consent URL, exchanges codes and refreshes tokens
//! - [`TokenStore`] caches tokens in a [`SecureStore`](bridge_traits::SecureStore)
//! - [`Authorizer`] ties them together and serves bearer tokens to the Drive connector

pub mod authorizer;
pub mod error;
pub mod oauth;
pub mod token_store;
pub mod types;

pub use authorizer::{Authorizer, CodePrompt};
pub use error::{AuthError, Result};
pub use oauth::{
    OAuthConfig, OAuthFlowManager, PkceVerifier, DRIVE_METADATA_READONLY_SCOPE, DRIVE_SCOPE,
};
pub use token_store::TokenStore;
pub use types::{ClientSecrets, OAuthTokens};
