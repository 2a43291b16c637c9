//! Progress persistence abstraction.

use crate::error::CovenError;

/// Storage for the single serialized progress blob.
///
/// The blob is written after every state-mutating quest operation and read
/// once at startup.
pub trait ProgressStore: Send + Sync {
    /// Loads the last saved blob, or `None` when nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns `CovenError::Infrastructure` if the underlying storage fails.
    fn load(&self) -> Result<Option<String>, CovenError>;

    /// Replaces the saved blob.
    ///
    /// # Errors
    ///
    /// Returns `CovenError::Infrastructure` if the underlying storage fails.
    fn save(&self, blob: &str) -> Result<(), CovenError>;
}
