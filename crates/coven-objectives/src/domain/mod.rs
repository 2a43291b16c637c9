//! Tracked actions, snapshots and the history abstraction.

pub mod action;
pub mod direction;
pub mod history;
pub mod snapshot;
