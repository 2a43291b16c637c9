//! Test progress stores.

use std::sync::Mutex;

use coven_core::error::CovenError;
use coven_core::store::ProgressStore;

/// A progress store that keeps the latest blob in memory and counts saves.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    blob: Mutex<Option<String>>,
    saves: Mutex<usize>,
}

impl MemoryProgressStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `blob`.
    #[must_use]
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
            saves: Mutex::new(0),
        }
    }

    /// Returns the latest saved blob.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn blob(&self) -> Option<String> {
        self.blob.lock().unwrap().clone()
    }

    /// Returns how many times `save` was called.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load(&self) -> Result<Option<String>, CovenError> {
        Ok(self.blob.lock().unwrap().clone())
    }

    fn save(&self, blob: &str) -> Result<(), CovenError> {
        *self.blob.lock().unwrap() = Some(blob.to_owned());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}

/// A progress store that always fails. Useful for testing that persistence
/// errors never roll back in-memory progress.
#[derive(Debug)]
pub struct FailingProgressStore;

impl ProgressStore for FailingProgressStore {
    fn load(&self) -> Result<Option<String>, CovenError> {
        Err(CovenError::Infrastructure("disk unavailable".into()))
    }

    fn save(&self, _blob: &str) -> Result<(), CovenError> {
        Err(CovenError::Infrastructure("disk unavailable".into()))
    }
}
