use crate::shared::paths::{ensure_dir, get_storage_dir};
use crate::views::CalendarMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_REMOTE_URL: &str = "STUDYPLAN_REMOTE_URL";
pub const ENV_REMOTE_KEY: &str = "STUDYPLAN_REMOTE_KEY";
pub const ENV_DEFAULT_VIEW: &str = "STUDYPLAN_DEFAULT_VIEW";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// PostgREST endpoint; `None` runs on the local fallback alone.
    pub remote_url: Option<String>,
    pub remote_api_key: Option<String>,
    pub default_view: CalendarMode,
    pub log_filter: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            remote_url: None,
            remote_api_key: None,
            default_view: CalendarMode::Week,
            log_filter: "info".to_string(),
        }
    }
}

impl AppSettings {
    /// Remote URL and key, when both are set and non-blank.
    pub fn remote(&self) -> Option<(&str, &str)> {
        let url = self.remote_url.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let key = self.remote_api_key.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((url, key))
    }

    /// Apply environment overrides read through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_REMOTE_URL) {
            self.remote_url = Some(url);
        }
        if let Some(key) = lookup(ENV_REMOTE_KEY) {
            self.remote_api_key = Some(key);
        }
        if let Some(view) = lookup(ENV_DEFAULT_VIEW) {
            match view.parse() {
                Ok(mode) => self.default_view = mode,
                Err(e) => tracing::warn!(target: "system", "Ignoring {}: {}", ENV_DEFAULT_VIEW, e),
            }
        }
        self
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    ParseError(#[from] serde_json::Error),
}

pub fn get_settings_path() -> PathBuf {
    get_storage_dir().join("settings.json")
}

/// Settings from the default location plus environment overrides.
pub fn load_settings() -> AppSettings {
    load_settings_from(&get_settings_path()).with_env_overrides()
}

/// Settings from `path`; defaults when the file is missing or unreadable.
pub fn load_settings_from(path: &Path) -> AppSettings {
    if !path.exists() {
        return AppSettings::default();
    }

    read_settings_file(path).unwrap_or_else(|e| {
        tracing::warn!(target: "system", "Falling back to default settings: {}", e);
        AppSettings::default()
    })
}

fn read_settings_file(path: &Path) -> Result<AppSettings, SettingsError> {
    let contents = std::fs::read_to_string(path)?;
    let settings = serde_json::from_str(&contents)?;
    Ok(settings)
}

pub fn save_settings(settings: &AppSettings) -> Result<(), SettingsError> {
    save_settings_to(&get_settings_path(), settings)
}

pub fn save_settings_to(path: &Path, settings: &AppSettings) -> Result<(), SettingsError> {
    if let Some(dir) = path.parent() {
        ensure_dir(dir)?;
    }
    let contents = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join("settings.json"));
        assert_eq!(settings, AppSettings::default());
        assert!(settings.remote().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = AppSettings {
            remote_url: Some("https://db.example.com".to_string()),
            remote_api_key: Some("anon".to_string()),
            default_view: CalendarMode::Month,
            log_filter: "debug".to_string(),
        };

        save_settings_to(&path, &settings).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"remoteUrl\""));
        assert!(raw.contains("\"month\""));
        assert_eq!(load_settings_from(&path), settings);
    }

    #[test]
    fn test_partial_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        std::fs::write(&path, r#"{"defaultView": "month"}"#).unwrap();
        let partial = load_settings_from(&path);
        assert_eq!(partial.default_view, CalendarMode::Month);
        assert_eq!(partial.log_filter, "info");

        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(load_settings_from(&path), AppSettings::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_REMOTE_URL, "https://db.example.com"),
            (ENV_REMOTE_KEY, "anon"),
            (ENV_DEFAULT_VIEW, "monthly"),
        ]
        .into_iter()
        .collect();

        let settings =
            AppSettings::default().with_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(settings.remote(), Some(("https://db.example.com", "anon")));
        assert_eq!(settings.default_view, CalendarMode::Month);

        let ignored = AppSettings::default()
            .with_overrides(|name| (name == ENV_DEFAULT_VIEW).then(|| "yearly".to_string()));
        assert_eq!(ignored.default_view, CalendarMode::Week);
    }
}
