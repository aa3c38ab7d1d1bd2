pub mod local;
pub mod migrations;

use crate::shared::errors::StorageError;
use crate::shared::paths::ensure_dir;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

pub use local::{KeyValueStore, MemoryStore};

/// Database wrapper with thread-safe connection
pub struct Database(pub Mutex<Connection>);

impl Database {
    pub(crate) fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
        self.0.lock().map_err(|e| StorageError::poisoned(e.to_string()))
    }
}

/// Open the database at `path`, run migrations, and import a legacy export if one sits next to it.
pub fn init_database(path: &Path) -> Result<Database, StorageError> {
    if let Some(dir) = path.parent() {
        ensure_dir(dir).map_err(|e| StorageError::directory(e.to_string()))?;
    }

    let conn = Connection::open(path)?;
    migrations::run_migrations(&conn)?;

    if let Some(dir) = path.parent() {
        if let Err(e) = migrations::import_legacy_export(&conn, dir) {
            tracing::warn!(target: "system", "Failed to import legacy local storage export: {}", e);
        }
    }

    tracing::info!(target: "system", "Database initialized at {:?}", path);

    Ok(Database(Mutex::new(conn)))
}

/// In-memory database with the same schema, for tests and throwaway sessions.
pub fn open_in_memory() -> Result<Database, StorageError> {
    let conn = Connection::open_in_memory()?;
    migrations::run_migrations(&conn)?;
    Ok(Database(Mutex::new(conn)))
}
