//! Binary Coven Core — shared abstractions.
//!
//! This crate defines the collaborator traits and value types that the
//! quest, dialogue and objective crates depend on. It contains no
//! infrastructure code.

pub mod camera;
pub mod clock;
pub mod content;
pub mod error;
pub mod event;
pub mod grid;
pub mod store;
