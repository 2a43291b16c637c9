//! Content source abstraction.

use async_trait::async_trait;

use crate::error::CovenError;

/// Fetches raw quest and dialogue documents by id or path.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Returns the raw document text for `source`.
    ///
    /// # Errors
    ///
    /// Returns `CovenError::Infrastructure` if the document cannot be read.
    async fn fetch(&self, source: &str) -> Result<String, CovenError>;
}
