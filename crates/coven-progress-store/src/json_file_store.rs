//! JSON-file implementation of the `ProgressStore` trait.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use coven_core::error::CovenError;
use coven_core::store::ProgressStore;
use tracing::debug;

/// Keeps the progress blob in a single file.
///
/// Saves write a sibling temp file and rename it over the target, so a crash
/// mid-write leaves the previous save intact.
#[derive(Debug, Clone)]
pub struct JsonFileProgressStore {
    path: PathBuf,
}

impl JsonFileProgressStore {
    /// Creates a store backed by `path`. Nothing is touched until the first
    /// load or save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ProgressStore for JsonFileProgressStore {
    fn load(&self) -> Result<Option<String>, CovenError> {
        match fs::read_to_string(&self.path) {
            Ok(blob) => {
                debug!(path = %self.path.display(), bytes = blob.len(), "progress file read");
                Ok(Some(blob))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CovenError::Infrastructure(format!(
                "reading {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn save(&self, blob: &str) -> Result<(), CovenError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                CovenError::Infrastructure(format!("creating {}: {e}", parent.display()))
            })?;
        }

        let temp = self.temp_path();
        fs::write(&temp, blob)
            .map_err(|e| CovenError::Infrastructure(format!("writing {}: {e}", temp.display())))?;
        fs::rename(&temp, &self.path).map_err(|e| {
            CovenError::Infrastructure(format!("replacing {}: {e}", self.path.display()))
        })?;

        debug!(path = %self.path.display(), bytes = blob.len(), "progress file written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_returns_none() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileProgressStore::new(dir.path().join("progress.json"));

        // Act
        let loaded = store.load().unwrap();

        // Assert
        assert_eq!(loaded, None);
    }

    #[test]
    fn test_save_then_load_returns_latest_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileProgressStore::new(dir.path().join("progress.json"));

        store.save(r#"{"quests":[]}"#).unwrap();
        store.save(r#"{"quests":[],"activeQuestId":"intro"}"#).unwrap();

        assert_eq!(
            store.load().unwrap().as_deref(),
            Some(r#"{"quests":[],"activeQuestId":"intro"}"#)
        );
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_save_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saves").join("slot-1").join("progress.json");
        let store = JsonFileProgressStore::new(&path);

        store.save("{}").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_unreadable_path_is_an_infrastructure_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileProgressStore::new(dir.path());

        let result = store.load();

        assert!(matches!(result, Err(CovenError::Infrastructure(_))));
    }
}
