//! Binary Coven — quest progression.
//!
//! [`application::manager::QuestManager`] owns the quest → phase → objective
//! state machine and composes the objective tracker and the dialogue
//! manager. [`application::engine::QuestEngine`] is the single context the
//! host constructs at startup: it routes bus events into the manager and
//! forwards everything the manager emits back onto the bus.

pub mod application;
pub mod domain;
