use std::path::{Path, PathBuf};

const APP_DIR: &str = "studyplan";

/// Get the base storage directory.
/// Returns `$XDG_DATA_HOME/studyplan`, the platform data dir, or `~/.local/share/studyplan`.
pub fn get_storage_dir() -> PathBuf {
    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg_data).join(APP_DIR);
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join(APP_DIR);
    }

    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".local")
        .join("share")
        .join(APP_DIR)
}

/// Get the logs directory path.
/// Returns `{storage_dir}/logs`.
pub fn get_log_dir() -> PathBuf {
    get_storage_dir().join("logs")
}

/// Path of the SQLite file holding the local fallback cache.
pub fn get_database_path() -> PathBuf {
    get_storage_dir().join("studyplan.db")
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_dir_structure() {
        let storage = get_storage_dir();
        assert!(storage.ends_with("studyplan"));

        let logs = get_log_dir();
        assert!(logs.ends_with("logs"));

        let db = get_database_path();
        assert!(db.ends_with("studyplan.db"));
    }

    #[test]
    fn test_ensure_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // second call is a no-op
        ensure_dir(&nested).unwrap();
    }
}
