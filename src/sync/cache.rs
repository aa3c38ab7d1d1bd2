use super::record::SyncRecord;
use crate::shared::errors::StorageError;
use crate::storage::KeyValueStore;
use rand::Rng;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

const ID_SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// Owner-partitioned list of records kept in a key-value store under
/// `T::LOCAL_PREFIX + owner_id`, newest first.
///
/// An id→owner index avoids scanning every bucket when a write arrives with
/// only a record id. The index is rebuilt lazily: a miss falls back to a scan.
pub struct FallbackCache<T: SyncRecord> {
    store: Arc<dyn KeyValueStore>,
    index: Mutex<HashMap<String, String>>,
    _record: PhantomData<fn() -> T>,
}

impl<T: SyncRecord> FallbackCache<T> {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            index: Mutex::new(HashMap::new()),
            _record: PhantomData,
        }
    }

    pub fn key(owner_id: &str) -> String {
        format!("{}{}", T::LOCAL_PREFIX, owner_id)
    }

    /// Records cached for `owner_id`; empty when nothing was ever cached.
    pub fn load(&self, owner_id: &str) -> Result<Vec<T>, StorageError> {
        let records: Vec<T> = match self.store.get(&Self::key(owner_id))? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        };
        self.remember(owner_id, &records);
        Ok(records)
    }

    /// Replace the owner's bucket. An empty list removes the key.
    pub fn save(&self, owner_id: &str, records: &[T]) -> Result<(), StorageError> {
        let key = Self::key(owner_id);
        if records.is_empty() {
            self.store.remove(&key)?;
        } else {
            self.store.set(&key, &serde_json::to_string(records)?)?;
        }
        self.remember(owner_id, records);
        Ok(())
    }

    /// Put `record` at the front of its owner's bucket.
    pub fn prepend(&self, record: T) -> Result<(), StorageError> {
        let owner_id = record.owner_id().to_string();
        let mut records = self.load(&owner_id)?;
        records.insert(0, record);
        self.save(&owner_id, &records)
    }

    /// Owner ids that have a bucket.
    pub fn owners(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .store
            .keys(T::LOCAL_PREFIX)?
            .into_iter()
            .filter_map(|key| key.strip_prefix(T::LOCAL_PREFIX).map(str::to_string))
            .collect())
    }

    /// Locate the bucket holding `id`, returning its owner and contents.
    fn locate(&self, id: &str) -> Result<Option<(String, Vec<T>)>, StorageError> {
        let hinted = self.index.lock().ok().and_then(|index| index.get(id).cloned());

        if let Some(owner_id) = hinted {
            let records = self.load(&owner_id)?;
            if records.iter().any(|r| r.id() == id) {
                return Ok(Some((owner_id, records)));
            }
            tracing::debug!(target: "sync::cache", id = %id, "Stale index entry, scanning buckets");
        }

        for owner_id in self.owners()? {
            let records = self.load(&owner_id)?;
            if records.iter().any(|r| r.id() == id) {
                return Ok(Some((owner_id, records)));
            }
        }

        Ok(None)
    }

    /// Find a cached record by id in any bucket.
    pub fn find(&self, id: &str) -> Result<Option<T>, StorageError> {
        Ok(self
            .locate(id)?
            .and_then(|(_, records)| records.into_iter().find(|r| r.id() == id)))
    }

    /// Apply `change` to the cached record with `id` and persist its bucket.
    pub fn modify<F>(&self, id: &str, change: F) -> Result<Option<T>, StorageError>
    where
        F: FnOnce(&mut T),
    {
        let Some((owner_id, mut records)) = self.locate(id)? else {
            return Ok(None);
        };

        let Some(record) = records.iter_mut().find(|r| r.id() == id) else {
            return Ok(None);
        };
        change(record);
        let updated = record.clone();

        self.save(&owner_id, &records)?;
        Ok(Some(updated))
    }

    /// Remove the first cached record with `id`. Returns whether anything was removed.
    pub fn remove(&self, id: &str) -> Result<bool, StorageError> {
        let Some((owner_id, mut records)) = self.locate(id)? else {
            return Ok(false);
        };

        let Some(position) = records.iter().position(|r| r.id() == id) else {
            return Ok(false);
        };
        records.remove(position);

        self.save(&owner_id, &records)?;
        if let Ok(mut index) = self.index.lock() {
            index.remove(id);
        }
        Ok(true)
    }

    /// Whether any owner's bucket holds a record with `id`.
    pub fn contains(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.locate(id)?.is_some())
    }

    /// Generate an id of the form `local_<millis>_<suffix>` not used by any cached record.
    pub fn generate_id(&self) -> Result<String, StorageError> {
        loop {
            let id = format!(
                "local_{}_{}",
                chrono::Utc::now().timestamp_millis(),
                random_suffix(ID_SUFFIX_LEN)
            );
            if !self.contains(&id)? {
                return Ok(id);
            }
        }
    }

    fn remember(&self, owner_id: &str, records: &[T]) {
        if let Ok(mut index) = self.index.lock() {
            for record in records {
                index.insert(record.id().to_string(), owner_id.to_string());
            }
        }
    }
}

fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ID_SUFFIX_ALPHABET[rng.gen_range(0..ID_SUFFIX_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::planner::types::{CreateTodoInput, Todo};
    use crate::storage::MemoryStore;
    use chrono::Utc;

    fn cache() -> FallbackCache<Todo> {
        FallbackCache::new(Arc::new(MemoryStore::new()))
    }

    fn local_todo(id: &str, owner: &str) -> Todo {
        Todo::new_local(
            id.to_string(),
            owner,
            &CreateTodoInput::titled(format!("todo {}", id)),
            Utc::now(),
        )
    }

    #[test]
    fn test_key_uses_record_prefix() {
        assert_eq!(FallbackCache::<Todo>::key("guest_1"), "local_todos_guest_1");
    }

    #[test]
    fn test_prepend_keeps_newest_first() {
        let cache = cache();
        cache.prepend(local_todo("a", "o1")).unwrap();
        cache.prepend(local_todo("b", "o1")).unwrap();

        let ids: Vec<String> = cache.load("o1").unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(cache.load("o2").unwrap().is_empty());
    }

    #[test]
    fn test_modify_finds_record_in_other_owner_bucket() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let writer = FallbackCache::<Todo>::new(store.clone());
        writer.prepend(local_todo("a", "o1")).unwrap();
        writer.prepend(local_todo("b", "o2")).unwrap();

        // A fresh cache has an empty index and must scan.
        let reader = FallbackCache::<Todo>::new(store);
        let updated = reader
            .modify("b", |todo| todo.completed = true)
            .unwrap()
            .unwrap();
        assert!(updated.completed);
        assert!(reader.load("o2").unwrap()[0].completed);
        assert!(!reader.load("o1").unwrap()[0].completed);
    }

    #[test]
    fn test_contains_searches_every_owner_bucket() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let writer = FallbackCache::<Todo>::new(store.clone());
        writer.prepend(local_todo("local_1_abc", "o2")).unwrap();

        // empty index: the lookup has to scan o2's bucket
        let reader = FallbackCache::<Todo>::new(store);
        assert!(reader.contains("local_1_abc").unwrap());
        assert!(!reader.contains("local_1_xyz").unwrap());
    }

    #[test]
    fn test_remove_missing_is_false() {
        let cache = cache();
        cache.prepend(local_todo("a", "o1")).unwrap();
        assert!(!cache.remove("zzz").unwrap());
        assert!(cache.remove("a").unwrap());
        assert!(cache.owners().unwrap().is_empty());
    }

    #[test]
    fn test_generated_ids_have_local_shape_and_differ() {
        let cache = cache();
        let first = cache.generate_id().unwrap();
        let second = cache.generate_id().unwrap();

        assert!(first.starts_with("local_"));
        let suffix = first.rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), ID_SUFFIX_LEN);
        assert_ne!(first, second);
    }
}
