//! Lightweight action state for dialogue gating.

use std::collections::{HashMap, HashSet};

use coven_core::event::BusEvent;
use coven_objectives::domain::action::TrackedAction;
use coven_objectives::domain::history::{ActionHistory, Signal};

/// What the player has done since the current dialogue opened.
///
/// Unlike the objective log this keeps only flags, the set of directions and
/// the latest program text, so it is cheap to re-check on every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TutorialState {
    directions: HashSet<String>,
    signals: HashSet<Signal>,
    latest_code: Option<String>,
    plants: HashMap<String, u32>,
    harvests: HashMap<String, u32>,
}

impl TutorialState {
    /// Folds `event` into the state. Returns whether it was a player action.
    pub fn observe(&mut self, event: &BusEvent) -> bool {
        let Some(action) = TrackedAction::from_bus_event(event) else {
            return false;
        };
        match action {
            TrackedAction::Movement { direction } => {
                self.directions.insert(direction);
            }
            TrackedAction::TerminalOpened => {
                self.signals.insert(Signal::TerminalOpened);
            }
            TrackedAction::CodeChanged { content } => self.latest_code = Some(content),
            TrackedAction::PlayClicked => {
                self.signals.insert(Signal::PlayClicked);
            }
            TrackedAction::PlantClicked => {
                self.signals.insert(Signal::PlantClicked);
            }
            TrackedAction::HarvestClicked => {
                self.signals.insert(Signal::HarvestClicked);
            }
            TrackedAction::EntityPlant { entity_id, .. } => {
                *self.plants.entry(entity_id).or_default() += 1;
            }
            TrackedAction::EntityHarvest { entity_id, .. } => {
                *self.harvests.entry(entity_id).or_default() += 1;
            }
        }
        true
    }

    /// Forgets everything.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl ActionHistory for TutorialState {
    fn has_moved(&self, direction: &str) -> bool {
        self.directions.contains(direction)
    }

    fn has_signal(&self, signal: Signal) -> bool {
        self.signals.contains(&signal)
    }

    fn latest_code(&self) -> Option<&str> {
        self.latest_code.as_deref()
    }

    fn entity_plants(&self, entity_id: &str) -> u32 {
        self.plants.get(entity_id).copied().unwrap_or(0)
    }

    fn entity_harvests(&self, entity_id: &str) -> u32 {
        self.harvests.get(entity_id).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_tracks_directions_flags_and_latest_code() {
        let mut state = TutorialState::default();

        assert!(state.observe(&BusEvent::TutorialMovement {
            direction: "d".to_owned()
        }));
        state.observe(&BusEvent::TutorialTerminalOpened);
        state.observe(&BusEvent::TutorialCodeChanged {
            content: "a".to_owned(),
        });
        state.observe(&BusEvent::TutorialCodeChanged {
            content: "b".to_owned(),
        });

        assert!(state.has_moved("right"));
        assert!(state.has_signal(Signal::TerminalOpened));
        assert!(!state.has_signal(Signal::PlayClicked));
        assert_eq!(state.latest_code(), Some("b"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut state = TutorialState::default();
        state.observe(&BusEvent::ActionPlantClicked);

        state.reset();

        assert_eq!(state, TutorialState::default());
    }

    #[test]
    fn test_produced_events_do_not_change_state() {
        let mut state = TutorialState::default();

        assert!(!state.observe(&BusEvent::DialogueClosed));
        assert_eq!(state, TutorialState::default());
    }
}
