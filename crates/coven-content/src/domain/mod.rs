//! Content definitions.

pub mod dialogue;
pub mod objective;
pub mod quest;
