//! # Authorizer
//!
//! Produces an authorized Drive session for the command-line jobs.
//!
//! [`Authorizer::authorize`] tries, in order:
//!
//! 1. the cached token, when it is not about to expire
//! 2. a refresh with the cached refresh token
//! 3. the interactive consent flow: the consent URL is handed to a
//!    [`CodePrompt`], which returns the code (or the whole redirect URL) the
//!    user pasted back
//!
//! Once authorized, the `Authorizer` serves bearer tokens through
//! [`AccessTokenProvider`], refreshing them when they approach expiry. A
//! single mutex guards the token so concurrent requests trigger at most one
//! refresh.

use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::AccessTokenProvider;
use bridge_traits::time::{Clock, SystemClock};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{AuthError, Result};
use crate::oauth::OAuthFlowManager;
use crate::token_store::TokenStore;
use crate::types::{OAuthTokens, DEFAULT_EXPIRY_BUFFER_SECS};

/// Collects the authorization code from the user.
#[async_trait]
pub trait CodePrompt: Send + Sync {
    /// Show `auth_url` and return what the user pasted back.
    async fn prompt_code(&self, auth_url: &str) -> Result<String>;
}

pub struct Authorizer {
    flow: OAuthFlowManager,
    token_store: TokenStore,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
    current: Mutex<Option<OAuthTokens>>,
}

impl Authorizer {
    pub fn new(flow: OAuthFlowManager, token_store: TokenStore) -> Self {
        Self {
            flow,
            token_store,
            clock: Arc::new(SystemClock),
            event_bus: None,
            current: Mutex::new(None),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Establish a usable token, prompting the user only when neither the
    /// cache nor a refresh can provide one.
    #[instrument(skip(self, prompt))]
    pub async fn authorize(&self, prompt: &dyn CodePrompt) -> Result<()> {
        let mut current = self.current.lock().await;

        let cached = match self.token_store.retrieve().await {
            Ok(cached) => cached,
            Err(AuthError::TokenCorrupted(reason)) => {
                warn!(%reason, "Ignoring corrupted token cache");
                None
            }
            Err(e) => return Err(e),
        };

        if let Some(tokens) = cached {
            if !self.is_expired(&tokens) {
                info!(expires_at = %tokens.expires_at, "Using cached token");
                self.emit(AuthEvent::TokenLoaded);
                *current = Some(tokens);
                return Ok(());
            }

            if let Some(refresh_token) = tokens.refresh_token.as_deref() {
                match self.refresh(refresh_token).await {
                    Ok(fresh) => {
                        *current = Some(fresh);
                        return Ok(());
                    }
                    Err(e) => {
                        warn!(error = %e, "Cached refresh token unusable, re-authorizing");
                    }
                }
            }
        }

        let tokens = self.authorize_interactively(prompt).await?;
        *current = Some(tokens);
        Ok(())
    }

    /// Current access token, refreshed first when it is about to expire.
    pub async fn valid_token(&self) -> Result<String> {
        let mut current = self.current.lock().await;

        let tokens = current.as_ref().ok_or(AuthError::NotAuthenticated)?;
        if !self.is_expired(tokens) {
            return Ok(tokens.access_token.clone());
        }

        debug!("Access token expiring, refreshing");
        let refresh_token = tokens
            .refresh_token
            .clone()
            .ok_or(AuthError::NotAuthenticated)?;

        let fresh = self.refresh(&refresh_token).await?;
        let access_token = fresh.access_token.clone();
        *current = Some(fresh);
        Ok(access_token)
    }

    /// Drop the cached token, forcing consent on the next run.
    pub async fn sign_out(&self) -> Result<()> {
        self.current.lock().await.take();
        self.token_store.delete().await
    }

    async fn authorize_interactively(&self, prompt: &dyn CodePrompt) -> Result<OAuthTokens> {
        self.emit(AuthEvent::AuthorizationRequired);

        let (auth_url, verifier) = self.flow.build_auth_url()?;
        let pasted = prompt.prompt_code(&auth_url).await?;

        let (code, state) = parse_pasted_code(&pasted)?;
        let state = state.unwrap_or_else(|| verifier.state().to_string());

        let tokens = match self.flow.exchange_code(&code, &state, &verifier).await {
            Ok(tokens) => tokens,
            Err(e) => {
                self.emit(AuthEvent::AuthError {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        self.token_store.store(&tokens).await?;
        info!("Authorization completed");
        self.emit(AuthEvent::Authorized);
        Ok(tokens)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens> {
        let fresh = match self.flow.refresh_access_token(refresh_token).await {
            Ok(fresh) => fresh,
            Err(e) => {
                self.emit(AuthEvent::AuthError {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        self.token_store.store(&fresh).await?;
        self.emit(AuthEvent::TokenRefreshed {
            expires_at: fresh.expires_at.timestamp(),
        });
        Ok(fresh)
    }

    fn is_expired(&self, tokens: &OAuthTokens) -> bool {
        tokens.is_expired_at(self.clock.now(), DEFAULT_EXPIRY_BUFFER_SECS)
    }

    fn emit(&self, event: AuthEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Auth(event));
        }
    }
}

#[async_trait]
impl AccessTokenProvider for Authorizer {
    async fn access_token(&self) -> BridgeResult<String> {
        self.valid_token().await.map_err(BridgeError::from)
    }
}

/// Accept either the bare code or the full redirect URL the browser landed on.
fn parse_pasted_code(input: &str) -> Result<(String, Option<String>)> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AuthError::InvalidAuthCode(
            "no authorization code entered".to_string(),
        ));
    }

    let Ok(url) = Url::parse(input) else {
        return Ok((input.to_string(), None));
    };

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => {
                return Err(AuthError::AuthenticationFailed(format!(
                    "consent was not granted: {}",
                    value
                )))
            }
            _ => {}
        }
    }

    let code = code.ok_or_else(|| {
        AuthError::InvalidAuthCode("redirect URL carries no code parameter".to_string())
    })?;
    Ok((code, state))
}
