//! Binary Coven — dialogue sequencing.
//!
//! Drives one linear dialogue at a time. An entry may carry a gating
//! objective; once the player has acknowledged it the dialogue steps aside
//! and advances on its own when the objective is met.

pub mod application;
pub mod domain;
