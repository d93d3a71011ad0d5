use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Remote service returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether repeating the same call could plausibly succeed.
    ///
    /// Transport failures, timeouts, throttling and 5xx responses are
    /// transient. Other 4xx responses and missing capabilities are not.
    pub fn is_transient(&self) -> bool {
        match self {
            BridgeError::NotAvailable(_) => false,
            BridgeError::OperationFailed(_) => true,
            BridgeError::Io(_) => true,
            BridgeError::Http { status, message } => match *status {
                408 | 429 => true,
                403 => message.contains("rateLimitExceeded")
                    || message.contains("userRateLimitExceeded"),
                s => s >= 500,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, message: &str) -> BridgeError {
        BridgeError::Http {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_server_errors_are_transient() {
        assert!(http(500, "backend").is_transient());
        assert!(http(503, "unavailable").is_transient());
        assert!(http(429, "slow down").is_transient());
    }

    #[test]
    fn test_client_errors_are_permanent() {
        assert!(!http(400, "bad request").is_transient());
        assert!(!http(404, "File not found").is_transient());
        assert!(!http(403, "insufficientPermissions").is_transient());
    }

    #[test]
    fn test_rate_limit_forbidden_is_transient() {
        assert!(http(403, r#"{"reason":"userRateLimitExceeded"}"#).is_transient());
    }

    #[test]
    fn test_transport_failures_are_transient() {
        assert!(BridgeError::OperationFailed("connection reset".into()).is_transient());
        assert!(!BridgeError::NotAvailable("HttpClient".into()).is_transient());
    }
}
