//! Binary Coven — objective tracking.
//!
//! An append-only, per-phase log of player actions and the pure predicates
//! that decide whether an objective holds. The predicates are shared with the
//! dialogue crate through the [`domain::history::ActionHistory`] trait.

pub mod application;
pub mod domain;
