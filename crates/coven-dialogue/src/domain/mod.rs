//! Tutorial state tracked while a dialogue is open.

pub mod tutorial;
