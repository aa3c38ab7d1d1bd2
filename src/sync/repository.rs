use super::cache::FallbackCache;
use super::merge::{merge_local_first, Sourced};
use super::record::SyncRecord;
use super::remote::{Filter, RecordStore, RemoteError};
use super::SyncError;
use crate::plugins::planner::types::{Folder, Todo, UpdateTodoInput};
use crate::storage::KeyValueStore;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

pub type TodoRepository = Repository<Todo>;
pub type FolderRepository = Repository<Folder>;

/// CRUD facade over a remote record store with a local fallback cache.
///
/// The remote store is the source of truth. The cache is only written when a
/// remote call fails, and every remote failure diverts to it immediately.
pub struct Repository<T: SyncRecord> {
    remote: Arc<dyn RecordStore>,
    cache: FallbackCache<T>,
}

fn decode<T: SyncRecord>(row: Value) -> Result<T, RemoteError> {
    Ok(serde_json::from_value(row)?)
}

impl<T: SyncRecord> Repository<T> {
    pub fn new(remote: Arc<dyn RecordStore>, local: Arc<dyn KeyValueStore>) -> Self {
        Self {
            remote,
            cache: FallbackCache::new(local),
        }
    }

    pub fn cache(&self) -> &FallbackCache<T> {
        &self.cache
    }

    async fn fetch_remote(&self, owner_id: &str) -> Result<Vec<T>, RemoteError> {
        let rows = self
            .remote
            .select(T::TABLE, &Filter::owned_by(owner_id))
            .await?;
        rows.into_iter().map(decode).collect()
    }

    /// Records visible to `owner_id`, cached entries first.
    pub async fn list(&self, owner_id: &str) -> Result<Vec<T>, SyncError> {
        Ok(self
            .list_with_origin(owner_id)
            .await?
            .into_iter()
            .map(|entry| entry.record)
            .collect())
    }

    /// Like [`Repository::list`], with each record tagged by the store it came from.
    pub async fn list_with_origin(&self, owner_id: &str) -> Result<Vec<Sourced<T>>, SyncError> {
        match self.fetch_remote(owner_id).await {
            Ok(remote) => {
                let local = self.cache.load(owner_id).unwrap_or_else(|e| {
                    tracing::warn!(
                        target: "sync",
                        table = T::TABLE,
                        error = %e,
                        "Local cache unreadable, listing remote records only"
                    );
                    Vec::new()
                });
                tracing::debug!(
                    target: "sync",
                    table = T::TABLE,
                    local = local.len(),
                    remote = remote.len(),
                    "Listed records"
                );
                Ok(merge_local_first(local, remote))
            }
            Err(e) => {
                tracing::warn!(
                    target: "sync",
                    table = T::TABLE,
                    error = %e,
                    "Remote list failed, serving local fallback"
                );
                let local = self.cache.load(owner_id)?;
                Ok(local.into_iter().map(Sourced::local).collect())
            }
        }
    }

    /// Create a record for `owner_id`. Input is not validated here.
    pub async fn create(&self, owner_id: &str, input: &T::Create) -> Result<T, SyncError> {
        let payload = T::insert_payload(owner_id, input)?;

        let result = match self.remote.insert(T::TABLE, payload).await {
            Ok(row) => decode::<T>(row),
            Err(e) => Err(e),
        };

        match result {
            Ok(record) => Ok(record),
            Err(e) => {
                tracing::warn!(
                    target: "sync",
                    table = T::TABLE,
                    error = %e,
                    "Remote insert failed, creating locally"
                );
                self.create_local(owner_id, input)
            }
        }
    }

    fn create_local(&self, owner_id: &str, input: &T::Create) -> Result<T, SyncError> {
        let id = self.cache.generate_id()?;
        let record = T::new_local(id, owner_id, input, Utc::now());

        self.cache.prepend(record.clone())?;
        tracing::info!(
            target: "sync",
            table = T::TABLE,
            id = %record.id(),
            "Record stored in local fallback"
        );
        Ok(record)
    }

    /// Apply a partial update to the record with `id`.
    pub async fn update(&self, id: &str, patch: &T::Patch) -> Result<T, SyncError> {
        let payload = serde_json::to_value(patch)?;

        let result = match self.remote.update(T::TABLE, id, payload).await {
            Ok(row) => decode::<T>(row),
            Err(e) => Err(e),
        };

        match result {
            Ok(record) => Ok(record),
            Err(e) => {
                tracing::warn!(
                    target: "sync",
                    table = T::TABLE,
                    id = %id,
                    error = %e,
                    "Remote update failed, updating local fallback"
                );
                let now = Utc::now();
                self.cache
                    .modify(id, |record| record.apply_patch(patch, now))?
                    .ok_or_else(|| SyncError::NotFound(id.to_string()))
            }
        }
    }

    /// Delete the record with `id`. A remote miss falls through to the local
    /// fallback; missing everywhere is a no-op.
    pub async fn delete(&self, id: &str) -> Result<(), SyncError> {
        let Err(e) = self.remote.delete(T::TABLE, id).await else {
            return Ok(());
        };

        tracing::warn!(
            target: "sync",
            table = T::TABLE,
            id = %id,
            error = %e,
            "Remote delete failed, deleting from local fallback"
        );

        if !self.cache.remove(id)? {
            tracing::debug!(target: "sync", table = T::TABLE, id = %id, "Nothing to delete locally");
        }
        Ok(())
    }
}

impl Repository<Todo> {
    /// Set the completed flag only.
    pub async fn toggle(&self, id: &str, completed: bool) -> Result<Todo, SyncError> {
        self.update(id, &UpdateTodoInput::completion(completed)).await
    }
}
