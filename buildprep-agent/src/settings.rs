//! Persisted key/value settings.
//!
//! Holds values the agent discovers on its own (the chosen backup base) so the
//! next run reuses them. Every `set` writes through to disk.

use crate::utils::errors::{PrepError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Backup base chosen by candidate probing.
pub const BACKUP_PATH_KEY: &str = "backup_path";

#[derive(Debug, Default)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    values: BTreeMap<String, String>,
}

impl SettingsStore {
    /// Load settings from `path`. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        let values = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .map_err(|e| PrepError::Settings(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            values,
        })
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string(&self.values)
            .map_err(|e| PrepError::Settings(e.to_string()))?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let store = SettingsStore::load(&temp_dir.path().join("settings.toml"))?;
        assert_eq!(store.get(BACKUP_PATH_KEY), None);
        Ok(())
    }

    #[test]
    fn test_set_persists_across_loads() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("state/settings.toml");

        let mut store = SettingsStore::load(&path)?;
        store.set(BACKUP_PATH_KEY, "/mnt/backup")?;

        let reloaded = SettingsStore::load(&path)?;
        assert_eq!(reloaded.get(BACKUP_PATH_KEY), Some("/mnt/backup"));
        Ok(())
    }

    #[test]
    fn test_corrupt_file_is_settings_error() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("settings.toml");
        std::fs::write(&path, "not = [valid")?;

        let err = SettingsStore::load(&path).unwrap_err();
        assert!(matches!(err, PrepError::Settings(_)));
        Ok(())
    }
}
