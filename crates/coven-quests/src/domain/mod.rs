//! Quest progress domain.

pub mod progress;
pub mod state;
