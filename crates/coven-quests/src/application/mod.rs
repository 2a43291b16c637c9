//! Quest orchestration.

pub mod engine;
pub mod manager;
pub mod rewards;
