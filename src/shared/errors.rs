use thiserror::Error;

/// Errors from the local key-value store backing the fallback cache.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to access database: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to parse stored data: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to create directory: {0}")]
    DirectoryError(String),

    #[error("Storage lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StorageError {
    pub fn directory(msg: impl Into<String>) -> Self {
        StorageError::DirectoryError(msg.into())
    }

    pub fn poisoned(msg: impl Into<String>) -> Self {
        StorageError::LockPoisoned(msg.into())
    }
}
