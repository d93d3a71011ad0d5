//! OAuth 2.0 authorization code flow with PKCE (RFC 6749, RFC 7636).
//!
//! The flow manager only talks to the token endpoint. Showing the consent URL
//! and collecting the pasted code is the caller's job, see
//! [`Authorizer`](crate::authorizer::Authorizer).
//!
//! Tokens, codes and verifiers are never logged.
//!
//! # Example
//!
//! ```no_run
//! use core_auth::oauth::{OAuthConfig, OAuthFlowManager, DRIVE_SCOPE};
//! use core_auth::ClientSecrets;
//! use std::sync::Arc;
//!
//! # async fn example(http_client: Arc<dyn bridge_traits::HttpClient>) -> core_auth::Result<()> {
//! let secrets = ClientSecrets::load("credentials.json".as_ref()).await?;
//! let config = OAuthConfig::from_client_secrets(&secrets, vec![DRIVE_SCOPE.to_string()]);
//!
//! let flow = OAuthFlowManager::new(config, http_client);
//! let (auth_url, verifier) = flow.build_auth_url()?;
//! println!("Visit: {}", auth_url);
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::{ClientSecrets, OAuthTokens};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bytes::Bytes;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Full read/write access, needed to create shortcuts.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Metadata-only read access, enough for the folder inventory.
pub const DRIVE_METADATA_READONLY_SCOPE: &str =
    "https://www.googleapis.com/auth/drive.metadata.readonly";

const MAX_REFRESH_ATTEMPTS: u32 = 3;

/// OAuth 2.0 client configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret (optional for public clients)
    pub client_secret: Option<String>,
    /// Redirect URI registered for the client
    pub redirect_uri: String,
    /// Scopes to request
    pub scopes: Vec<String>,
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token endpoint URL
    pub token_url: String,
}

impl OAuthConfig {
    pub fn from_client_secrets(secrets: &ClientSecrets, scopes: Vec<String>) -> Self {
        Self {
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            redirect_uri: secrets.redirect_uri().to_string(),
            scopes,
            auth_url: secrets.auth_uri.clone(),
            token_url: secrets.token_uri.clone(),
        }
    }
}

/// PKCE code verifier plus the CSRF state that goes with it.
///
/// Only the S256 challenge leaves the process during authorization; the
/// verifier itself is sent once, to the token endpoint.
#[derive(Debug, Clone)]
pub struct PkceVerifier {
    verifier: String,
    state: String,
}

impl PkceVerifier {
    /// Generate a 32-byte verifier and a 16-byte state, both base64url without padding.
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();

        let mut verifier_bytes = [0u8; 32];
        rng.fill(&mut verifier_bytes);

        let mut state_bytes = [0u8; 16];
        rng.fill(&mut state_bytes);

        Self {
            verifier: URL_SAFE_NO_PAD.encode(verifier_bytes),
            state: URL_SAFE_NO_PAD.encode(state_bytes),
        }
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// BASE64URL(SHA256(verifier))
    pub fn challenge(&self) -> String {
        let hash = Sha256::digest(self.verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hash)
    }
}

impl Default for PkceVerifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives the token-endpoint half of the authorization code flow.
pub struct OAuthFlowManager {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
}

impl OAuthFlowManager {
    pub fn new(config: OAuthConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the consent URL and the verifier that must accompany the code exchange.
    ///
    /// Offline access is requested so the first consent yields a refresh token.
    #[instrument(skip(self))]
    pub fn build_auth_url(&self) -> Result<(String, PkceVerifier)> {
        let verifier = PkceVerifier::new();
        let challenge = verifier.challenge();

        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AuthError::Other(format!("Invalid auth URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", verifier.state())
            .append_pair("code_challenge", &challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("access_type", "offline");

        debug!(scopes = ?self.config.scopes, "Built authorization URL");

        Ok((url.to_string(), verifier))
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// - [`AuthError::StateMismatch`] when `state` does not belong to `verifier`
    /// - [`AuthError::InvalidAuthCode`] when the token endpoint rejects the code
    /// - [`AuthError::NetworkError`] on transport failure
    #[instrument(skip(self, code, state, verifier))]
    pub async fn exchange_code(
        &self,
        code: &str,
        state: &str,
        verifier: &PkceVerifier,
    ) -> Result<OAuthTokens> {
        if state != verifier.state() {
            warn!("OAuth state mismatch, discarding authorization code");
            return Err(AuthError::StateMismatch {
                expected: verifier.state().to_string(),
                actual: state.to_string(),
            });
        }

        let form = TokenForm {
            code: Some(code),
            code_verifier: Some(verifier.verifier()),
            redirect_uri: Some(&self.config.redirect_uri),
            ..TokenForm::new("authorization_code", &self.config)
        };

        debug!("Exchanging authorization code for tokens");

        let response = self
            .http_client
            .execute(self.token_request(form.encode()?))
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        if !response.is_success() {
            let (status, detail) = error_details(&response);
            warn!(status, error = %detail, "Token endpoint rejected authorization code");
            return Err(AuthError::InvalidAuthCode(format!(
                "token endpoint answered {}: {}",
                status, detail
            )));
        }

        let granted = TokenResponse::parse(&response)?;
        info!(
            expires_in = granted.expires_in,
            has_refresh_token = granted.refresh_token.is_some(),
            "Exchanged authorization code for tokens"
        );
        Ok(granted.into_tokens(None))
    }

    /// Obtain a fresh access token.
    ///
    /// Server errors are retried up to three times with 100ms/200ms backoff;
    /// a 4xx (revoked or expired grant) fails immediately. The old refresh
    /// token is kept when the response does not rotate it.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<OAuthTokens> {
        let body = TokenForm {
            refresh_token: Some(refresh_token),
            ..TokenForm::new("refresh_token", &self.config)
        }
        .encode()?;

        let mut backoff = Duration::from_millis(100);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = self
                .http_client
                .execute(self.token_request(body.clone()))
                .await
                .map_err(|e| AuthError::TokenRefreshFailed(e.to_string()))?;

            if response.is_success() {
                let granted = TokenResponse::parse(&response)?;
                info!(expires_in = granted.expires_in, "Refreshed access token");
                return Ok(granted.into_tokens(Some(refresh_token)));
            }

            let (status, detail) = error_details(&response);
            if response.is_client_error() {
                warn!(status, error = %detail, "Token refresh rejected");
                return Err(AuthError::TokenRefreshFailed(format!(
                    "token endpoint answered {}: {}",
                    status, detail
                )));
            }
            if attempt >= MAX_REFRESH_ATTEMPTS {
                return Err(AuthError::TokenRefreshFailed(format!(
                    "gave up after {} attempts, last answer {}: {}",
                    attempt, status, detail
                )));
            }

            warn!(
                status,
                attempt,
                delay_ms = backoff.as_millis() as u64,
                "Token refresh failed, retrying"
            );
            sleep(backoff).await;
            backoff *= 2;
        }
    }

    fn token_request(&self, body: Bytes) -> HttpRequest {
        HttpRequest::new(HttpMethod::Post, self.config.token_url.clone())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
    }
}

/// Form body posted to the token endpoint; absent fields are omitted.
#[derive(Debug, Serialize)]
struct TokenForm<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_verifier: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uri: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
}

impl<'a> TokenForm<'a> {
    fn new(grant_type: &'static str, config: &'a OAuthConfig) -> Self {
        Self {
            grant_type,
            client_id: &config.client_id,
            client_secret: config.client_secret.as_deref(),
            code: None,
            code_verifier: None,
            redirect_uri: None,
            refresh_token: None,
        }
    }

    fn encode(&self) -> Result<Bytes> {
        serde_urlencoded::to_string(self)
            .map(Bytes::from)
            .map_err(|e| AuthError::Other(format!("Failed to encode token request: {}", e)))
    }
}

fn error_details(response: &HttpResponse) -> (u16, String) {
    let detail = response
        .text()
        .unwrap_or_else(|_| "<non-UTF-8 body>".to_string());
    (response.status, detail)
}

/// JSON body returned by the token endpoint.
#[derive(Debug, Deserialize, Serialize)]
struct TokenResponse {
    access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

impl TokenResponse {
    fn parse(response: &HttpResponse) -> Result<Self> {
        response
            .json()
            .map_err(|e| AuthError::Other(format!("Failed to parse token response: {}", e)))
    }

    /// `previous_refresh` survives when the endpoint does not rotate it.
    fn into_tokens(self, previous_refresh: Option<&str>) -> OAuthTokens {
        let refresh_token = self
            .refresh_token
            .or_else(|| previous_refresh.map(str::to_string));
        OAuthTokens::new(self.access_token, refresh_token, self.expires_in)
    }
}
