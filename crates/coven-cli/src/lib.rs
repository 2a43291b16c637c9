//! Binary Coven — headless runner.
//!
//! Loads quest content from disk, restores saved progress and replays a
//! JSON-lines script of player actions, logging every bus event.

pub mod adapters;
pub mod config;
pub mod error;
pub mod runner;
pub mod script;
