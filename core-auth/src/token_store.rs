//! Token persistence on top of a [`SecureStore`].
//!
//! Tokens are stored as JSON under a single key. A cached entry that no
//! longer parses is deleted and reported as [`AuthError::TokenCorrupted`], so
//! the next authorization starts clean.

use std::sync::Arc;

use bridge_traits::storage::SecureStore;
use tracing::{debug, info, warn};

use crate::error::{AuthError, Result};
use crate::types::OAuthTokens;

/// Reads and writes the cached [`OAuthTokens`].
#[derive(Clone)]
pub struct TokenStore {
    secure_store: Arc<dyn SecureStore>,
    key: String,
}

impl TokenStore {
    pub fn new(secure_store: Arc<dyn SecureStore>, key: impl Into<String>) -> Self {
        Self {
            secure_store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Persist tokens, replacing any previous entry.
    pub async fn store(&self, tokens: &OAuthTokens) -> Result<()> {
        let json = serde_json::to_vec(tokens)?;

        self.secure_store
            .set_secret(&self.key, &json)
            .await
            .map_err(|e| {
                warn!(key = %self.key, error = %e, "Failed to store tokens");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!(
            key = %self.key,
            has_refresh_token = tokens.refresh_token.is_some(),
            "Tokens stored"
        );
        Ok(())
    }

    /// Load cached tokens, `Ok(None)` when nothing is cached.
    pub async fn retrieve(&self) -> Result<Option<OAuthTokens>> {
        let data = self.secure_store.get_secret(&self.key).await.map_err(|e| {
            warn!(key = %self.key, error = %e, "Failed to read tokens");
            AuthError::SecureStorageUnavailable(e.to_string())
        })?;

        let Some(data) = data else {
            debug!(key = %self.key, "No cached tokens");
            return Ok(None);
        };

        match serde_json::from_slice::<OAuthTokens>(&data) {
            Ok(tokens) => {
                debug!(
                    key = %self.key,
                    expires_at = %tokens.expires_at,
                    "Loaded cached tokens"
                );
                Ok(Some(tokens))
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Cached tokens are corrupted, deleting");
                if let Err(delete_err) = self.secure_store.delete_secret(&self.key).await {
                    warn!(key = %self.key, error = %delete_err, "Failed to delete corrupted tokens");
                }
                Err(AuthError::TokenCorrupted(e.to_string()))
            }
        }
    }

    /// Remove cached tokens. Idempotent.
    pub async fn delete(&self) -> Result<()> {
        self.secure_store
            .delete_secret(&self.key)
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))?;
        info!(key = %self.key, "Tokens deleted");
        Ok(())
    }
}
