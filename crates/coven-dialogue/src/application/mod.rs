//! The dialogue manager.

pub mod manager;
