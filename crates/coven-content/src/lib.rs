//! Binary Coven — quest and dialogue content.
//!
//! Definitions for quests, phases, objectives, rewards and dialogue entries as
//! they appear in the JSON content files, plus parsing, validation and a
//! file-backed content source.

pub mod application;
pub mod domain;
