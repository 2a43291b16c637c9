//! Requirement evaluation and the tracker itself.

pub mod requirements;
pub mod tracker;
