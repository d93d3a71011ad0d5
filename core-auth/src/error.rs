use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("OAuth state mismatch (expected {expected}, got {actual})")]
    StateMismatch { expected: String, actual: String },

    #[error("Authorization code rejected: {0}")]
    InvalidAuthCode(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid client credentials: {0}")]
    InvalidCredentials(String),

    #[error("Cannot read client credentials from {path}: {source}")]
    CredentialsFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Stored token is corrupted: {0}")]
    TokenCorrupted(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<AuthError> for BridgeError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NetworkError(message) => BridgeError::OperationFailed(message),
            other => BridgeError::NotAvailable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_stay_transient_across_the_bridge() {
        let bridged: BridgeError = AuthError::NetworkError("reset".into()).into();
        assert!(bridged.is_transient());

        let bridged: BridgeError = AuthError::NotAuthenticated.into();
        assert!(!bridged.is_transient());
    }
}
