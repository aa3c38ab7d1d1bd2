use super::record::OWNER_COLUMN;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Any failure from the remote record store. Callers only care that it failed.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote store returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode remote record: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    #[error("Remote store rejected the request: {0}")]
    Rejected(String),
}

impl RemoteError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        RemoteError::Unavailable(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        RemoteError::Rejected(msg.into())
    }
}

/// Equality filter on a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn owned_by(owner_id: &str) -> Self {
        Self::eq(OWNER_COLUMN, owner_id)
    }

    pub fn matches(&self, row: &Value) -> bool {
        match row.get(&self.column) {
            Some(Value::String(s)) => *s == self.value,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == self.value,
        }
    }
}

/// Generic row store. Rows are plain JSON objects shaped like the table.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Rows matching `filter`, newest `created_at` first.
    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Value>, RemoteError>;

    /// Insert a row; the store assigns `id` and timestamps and returns the stored row.
    async fn insert(&self, table: &str, record: Value) -> Result<Value, RemoteError>;

    /// Update the row with `id`. Matching no row is an error.
    async fn update(&self, table: &str, id: &str, partial: Value) -> Result<Value, RemoteError>;

    /// Delete the row with `id`. Matching no row is an error.
    async fn delete(&self, table: &str, id: &str) -> Result<(), RemoteError>;
}

/// Store used when no remote is configured. Every call fails, so every
/// repository operation is served by the local cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisconnectedStore;

const DISCONNECTED: &str = "no remote store configured";

#[async_trait]
impl RecordStore for DisconnectedStore {
    async fn select(&self, _table: &str, _filter: &Filter) -> Result<Vec<Value>, RemoteError> {
        Err(RemoteError::unavailable(DISCONNECTED))
    }

    async fn insert(&self, _table: &str, _record: Value) -> Result<Value, RemoteError> {
        Err(RemoteError::unavailable(DISCONNECTED))
    }

    async fn update(&self, _table: &str, _id: &str, _partial: Value) -> Result<Value, RemoteError> {
        Err(RemoteError::unavailable(DISCONNECTED))
    }

    async fn delete(&self, _table: &str, _id: &str) -> Result<(), RemoteError> {
        Err(RemoteError::unavailable(DISCONNECTED))
    }
}
