use rusqlite::Connection;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const SCHEMA_VERSION: i32 = 1;

/// File name of a browser local-storage dump (`{ "key": "<value>" }`).
pub const LEGACY_EXPORT_FILE: &str = "local_storage.json";

/// Run database schema migrations
pub fn run_migrations(conn: &Connection) -> Result<(), rusqlite::Error> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version < 1 {
        conn.execute_batch(
            "
            -- Key-value entries mirroring browser local storage
            CREATE TABLE IF NOT EXISTS local_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            ",
        )?;
    }

    if version < SCHEMA_VERSION {
        conn.execute_batch(&format!("PRAGMA user_version = {};", SCHEMA_VERSION))?;
        tracing::info!(
            target: "system",
            from = version,
            to = SCHEMA_VERSION,
            "Database schema migrations completed"
        );
    }

    Ok(())
}

/// Import a legacy local-storage export into `local_entries`, then back the file up.
///
/// Entries already present in the database win; the import never overwrites.
pub fn import_legacy_export(
    conn: &Connection,
    storage_dir: &Path,
) -> Result<usize, Box<dyn std::error::Error>> {
    let export_path = storage_dir.join(LEGACY_EXPORT_FILE);

    if !export_path.exists() {
        return Ok(0);
    }

    tracing::info!(target: "system", "Found {}, importing...", LEGACY_EXPORT_FILE);

    let content = fs::read_to_string(&export_path)?;
    let entries: BTreeMap<String, String> = serde_json::from_str(&content)?;

    let now = chrono::Utc::now().timestamp_millis();
    let mut imported = 0;
    for (key, value) in &entries {
        imported += conn.execute(
            "INSERT OR IGNORE INTO local_entries (key, value, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value, now],
        )?;
    }

    let backup_path = storage_dir.join(format!("{}.bak", LEGACY_EXPORT_FILE));
    fs::rename(&export_path, &backup_path)?;

    tracing::info!(
        target: "system",
        "Legacy import completed: {} of {} entries",
        imported,
        entries.len()
    );

    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_import_legacy_export_keeps_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO local_entries (key, value, updated_at) VALUES ('local_todos_a', '[]', 0)",
            [],
        )
        .unwrap();

        let export = serde_json::json!({
            "local_todos_a": "[{\"id\":\"x\"}]",
            "local_todos_b": "[]",
            "guest_user_id": "guest_42",
        });
        fs::write(dir.path().join(LEGACY_EXPORT_FILE), export.to_string()).unwrap();

        let imported = import_legacy_export(&conn, dir.path()).unwrap();
        assert_eq!(imported, 2);

        let kept: String = conn
            .query_row(
                "SELECT value FROM local_entries WHERE key = 'local_todos_a'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(kept, "[]");
        assert!(!dir.path().join(LEGACY_EXPORT_FILE).exists());
        assert!(dir
            .path()
            .join(format!("{}.bak", LEGACY_EXPORT_FILE))
            .exists());
    }
}
