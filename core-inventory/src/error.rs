use thiserror::Error;

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Failed to list folder {folder_id}: {message}")]
    Listing { folder_id: String, message: String },

    #[error("Failed to write inventory: {0}")]
    Sink(String),

    #[error("Invalid inventory configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, InventoryError>;
