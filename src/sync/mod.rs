//! Local-first record synchronization.
//!
//! A [`Repository`] talks to a remote [`RecordStore`] first and falls back to an
//! owner-partitioned [`FallbackCache`] whenever the remote call fails.

pub mod cache;
pub mod memory;
pub mod merge;
pub mod postgrest;
pub mod record;
pub mod remote;
pub mod repository;

use crate::shared::errors::StorageError;
use thiserror::Error;

pub use cache::FallbackCache;
pub use memory::MemoryRecordStore;
pub use merge::{merge_local_first, Origin, Sourced};
pub use postgrest::PostgrestStore;
pub use record::SyncRecord;
pub use remote::{DisconnectedStore, Filter, RecordStore, RemoteError};
pub use repository::{FolderRepository, Repository, TodoRepository};

/// Errors a repository surfaces after fallback has been attempted.
///
/// Remote failures never appear here: they always divert to the local cache.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Local storage unavailable: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}
