//! File-backed `ContentSource`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use coven_core::content::ContentSource;
use coven_core::error::CovenError;
use tracing::debug;

/// Reads content documents from a directory.
///
/// A source `"quests/first_steps"` resolves to
/// `<root>/quests/first_steps.json`; sources that already end in `.json` are
/// used unchanged.
#[derive(Debug, Clone)]
pub struct FileContentSource {
    root: PathBuf,
}

impl FileContentSource {
    /// Creates a source rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the file path `source` resolves to.
    #[must_use]
    pub fn resolve(&self, source: &str) -> PathBuf {
        let relative = Path::new(source);
        let path = self.root.join(relative);
        if relative.extension().is_some_and(|ext| ext == "json") {
            path
        } else {
            path.with_extension("json")
        }
    }
}

#[async_trait]
impl ContentSource for FileContentSource {
    async fn fetch(&self, source: &str) -> Result<String, CovenError> {
        let path = self.resolve(source);
        debug!(path = %path.display(), "reading content document");
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            CovenError::Infrastructure(format!("failed to read {}: {e}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_appends_json_extension() {
        let source = FileContentSource::new("/content");

        assert_eq!(
            source.resolve("quests/first_steps"),
            PathBuf::from("/content/quests/first_steps.json")
        );
        assert_eq!(
            source.resolve("dialogue/intro.json"),
            PathBuf::from("/content/dialogue/intro.json")
        );
    }

    #[tokio::test]
    async fn test_fetch_reads_document() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.json"), r#"{"entries":[]}"#).unwrap();
        let source = FileContentSource::new(dir.path());

        // Act
        let raw = source.fetch("hello").await.unwrap();

        // Assert
        assert_eq!(raw, r#"{"entries":[]}"#);
    }

    #[tokio::test]
    async fn test_fetch_missing_file_is_infrastructure_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileContentSource::new(dir.path());

        let result = source.fetch("missing").await;

        assert!(matches!(result, Err(CovenError::Infrastructure(_))));
    }
}
