//! Core authentication types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{AuthError, Result};

/// Seconds before the real expiry at which a token is treated as expired.
pub const DEFAULT_EXPIRY_BUFFER_SECS: i64 = 300;

/// OAuth 2.0 tokens.
///
/// The `Debug` implementation redacts both tokens so the struct can appear
/// in log fields safely.
///
/// # Example
///
/// ```
/// use core_auth::OAuthTokens;
///
/// let tokens = OAuthTokens::new("ya29.a0".to_string(), Some("1//0g".to_string()), 3600);
/// assert!(!tokens.is_expired());
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokens {
    /// The access token used for API requests
    pub access_token: String,
    /// Long-lived refresh token. Google only returns one on first consent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
}

impl OAuthTokens {
    /// Create a token set expiring `expires_in` seconds from now.
    pub fn new(access_token: String, refresh_token: Option<String>, expires_in: i64) -> Self {
        Self::issued_at(access_token, refresh_token, expires_in, Utc::now())
    }

    /// Create a token set issued at `now`.
    pub fn issued_at(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: now + Duration::seconds(expires_in),
        }
    }

    /// Whether the token is expired or expires within the default buffer.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now(), DEFAULT_EXPIRY_BUFFER_SECS)
    }

    /// Whether the token is expired at `now`, counting `buffer_seconds` early.
    pub fn is_expired_at(&self, now: DateTime<Utc>, buffer_seconds: i64) -> bool {
        now >= self.expires_at - Duration::seconds(buffer_seconds)
    }

    /// Time remaining until expiry, `None` once expired.
    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Option<Duration> {
        if now >= self.expires_at {
            None
        } else {
            Some(self.expires_at - now)
        }
    }
}

impl fmt::Debug for OAuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokens")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Client credentials as downloaded from the Google Cloud console.
///
/// The file nests the fields under `installed` for desktop clients or `web`
/// for web clients; both are accepted.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ClientSecrets {
    /// Parse the console JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ClientSecretsFile = serde_json::from_str(json)
            .map_err(|e| AuthError::InvalidCredentials(e.to_string()))?;

        let secrets = file.installed.or(file.web).ok_or_else(|| {
            AuthError::InvalidCredentials(
                "expected an \"installed\" or \"web\" client section".to_string(),
            )
        })?;

        if secrets.client_id.trim().is_empty() {
            return Err(AuthError::InvalidCredentials(
                "client_id is empty".to_string(),
            ));
        }

        Ok(secrets)
    }

    /// Read and parse a credentials file.
    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| AuthError::CredentialsFile {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&json)
    }

    /// First registered redirect URI, falling back to the loopback address.
    pub fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or("http://localhost")
    }
}

impl fmt::Debug for ClientSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecrets")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("redirect_uris", &self.redirect_uris)
            .finish()
    }
}
