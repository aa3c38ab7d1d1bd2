use super::Database;
use crate::shared::errors::StorageError;
use rusqlite::OptionalExtension;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Synchronous key-value store with enumerable keys, the shape of browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// All keys starting with `prefix`, sorted.
    fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM local_entries WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO local_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, value, chrono::Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM local_entries WHERE key = ?1", [key])?;
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let conn = self.lock()?;
        // substr comparison avoids LIKE wildcards in owner ids ('_' is common)
        let mut stmt = conn.prepare(
            "SELECT key FROM local_entries WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )?;
        let keys = stmt
            .query_map([prefix], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore(RwLock<BTreeMap<String, String>>);

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let map = self
            .0
            .read()
            .map_err(|e| StorageError::poisoned(e.to_string()))?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self
            .0
            .write()
            .map_err(|e| StorageError::poisoned(e.to_string()))?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut map = self
            .0
            .write()
            .map_err(|e| StorageError::poisoned(e.to_string()))?;
        map.remove(key);
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let map = self
            .0
            .read()
            .map_err(|e| StorageError::poisoned(e.to_string()))?;
        Ok(map
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{init_database, open_in_memory};

    fn exercise(store: &dyn KeyValueStore) {
        assert_eq!(store.get("local_todos_a").unwrap(), None);

        store.set("local_todos_a", "[1]").unwrap();
        store.set("local_todos_b", "[2]").unwrap();
        store.set("local_folders_a", "[]").unwrap();
        store.set("local_todos_a", "[3]").unwrap();

        assert_eq!(store.get("local_todos_a").unwrap().as_deref(), Some("[3]"));
        assert_eq!(
            store.keys("local_todos_").unwrap(),
            vec!["local_todos_a".to_string(), "local_todos_b".to_string()]
        );

        store.remove("local_todos_b").unwrap();
        assert_eq!(store.get("local_todos_b").unwrap(), None);
        assert_eq!(store.keys("local_todos_").unwrap().len(), 1);
    }

    #[test]
    fn test_memory_store_contract() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn test_sqlite_store_contract() {
        exercise(&open_in_memory().unwrap());
    }

    #[test]
    fn test_sqlite_keys_prefix_is_literal() {
        let db = open_in_memory().unwrap();
        db.set("local_todos_guest_1", "[]").unwrap();
        db.set("localXtodosXguest", "[]").unwrap();
        assert_eq!(db.keys("local_todos_").unwrap(), vec!["local_todos_guest_1"]);
    }

    #[test]
    fn test_sqlite_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("studyplan.db");

        {
            let db = init_database(&path).unwrap();
            db.set("guest_user_id", "guest_1").unwrap();
        }

        let db = init_database(&path).unwrap();
        assert_eq!(
            db.get("guest_user_id").unwrap().as_deref(),
            Some("guest_1")
        );
    }
}
