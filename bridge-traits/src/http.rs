//! The HTTP seam used by the OAuth flow and the Drive connector.
//!
//! Requests are plain data; [`HttpClient`] performs one exchange per call and
//! [`AccessTokenProvider`] hands out the bearer token for it.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// Drive metadata reads are `GET`; token grants and shortcut creation are `POST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let json = serde_json::to_vec(body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON serialization failed: {}", e))
        })?;
        self.body = Some(Bytes::from(json));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON deserialization failed: {}", e))
        })
    }

    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid UTF-8: {}", e)))
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 4xx
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

/// Abstracts a single request/response exchange. Implementations perform
/// exactly one attempt per call; retry decisions belong to the caller, which
/// knows whether the request is safe to repeat.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest, HttpMethod};
///
/// async fn about(client: &dyn HttpClient, token: &str) -> Result<String> {
///     let about = HttpRequest::new(HttpMethod::Get, "https://www.googleapis.com/drive/v3/about")
///         .bearer_token(token);
///     client.execute(about).await?.text()
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Non-2xx responses are returned as `Ok`; only transport failures
    /// (connect, TLS, timeout) are errors.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Supplies a currently valid OAuth access token.
///
/// Implementations may refresh the token transparently, so callers should
/// ask for it per request instead of caching the string.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Fixed token, for tests and short-lived tools.
#[derive(Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
