//! Content loading.

pub mod file_source;
pub mod loader;
