//! In-memory content source.

use std::collections::HashMap;

use async_trait::async_trait;
use coven_core::content::ContentSource;
use coven_core::error::CovenError;

/// A content source backed by a fixed map of documents.
#[derive(Debug, Default, Clone)]
pub struct StaticContentSource {
    documents: HashMap<String, String>,
}

impl StaticContentSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document under `source`.
    #[must_use]
    pub fn with(mut self, source: &str, raw: &str) -> Self {
        self.documents.insert(source.to_owned(), raw.to_owned());
        self
    }
}

#[async_trait]
impl ContentSource for StaticContentSource {
    async fn fetch(&self, source: &str) -> Result<String, CovenError> {
        self.documents
            .get(source)
            .cloned()
            .ok_or_else(|| CovenError::Infrastructure(format!("no document named {source}")))
    }
}
