//! Error types for Google Drive provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Google Drive provider errors
#[derive(Error, Debug)]
pub enum GoogleDriveError {
    /// API request returned a non-2xx status
    #[error("Google Drive API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Google Drive operations
pub type Result<T> = std::result::Result<T, GoogleDriveError>;

impl GoogleDriveError {
    /// Build an API error from a response body, preferring the JSON
    /// `error.message` field the v3 API returns.
    pub fn from_response(status_code: u16, body: &[u8]) -> Self {
        #[derive(serde::Deserialize)]
        struct Envelope {
            error: Detail,
        }
        #[derive(serde::Deserialize)]
        struct Detail {
            message: String,
            #[serde(default)]
            errors: Vec<Reason>,
        }
        #[derive(serde::Deserialize)]
        struct Reason {
            #[serde(default)]
            reason: String,
        }

        let message = match serde_json::from_slice::<Envelope>(body) {
            Ok(envelope) => match envelope.error.errors.first() {
                Some(r) if !r.reason.is_empty() => {
                    format!("{} ({})", envelope.error.message, r.reason)
                }
                _ => envelope.error.message,
            },
            Err(_) => String::from_utf8_lossy(body).trim().to_string(),
        };

        GoogleDriveError::ApiError {
            status_code,
            message,
        }
    }
}

impl From<GoogleDriveError> for BridgeError {
    fn from(error: GoogleDriveError) -> Self {
        match error {
            GoogleDriveError::ApiError {
                status_code,
                message,
            } => BridgeError::Http {
                status: status_code,
                message,
            },
            GoogleDriveError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            GoogleDriveError::BridgeError(e) => e,
        }
    }
}
