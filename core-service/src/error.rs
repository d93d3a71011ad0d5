use thiserror::Error;

/// Anything that stops a job before or instead of a normal run.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),

    #[error("Authentication error: {0}")]
    Auth(#[from] core_auth::AuthError),

    #[error("Batch error: {0}")]
    Batch(#[from] core_batch::BatchError),

    #[error("Inventory error: {0}")]
    Inventory(#[from] core_inventory::InventoryError),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] core_spreadsheet::SpreadsheetError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
