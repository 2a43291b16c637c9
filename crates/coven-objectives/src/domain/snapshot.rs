//! Immutable copies of the objective log.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::action::{ObjectiveEvent, TrackedAction};
use super::history::{ActionHistory, Signal};

/// A deep, independent copy of the log at one instant.
///
/// Every objective checked in one pass is evaluated against the same
/// snapshot; events recorded afterwards are invisible to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveSnapshot {
    /// Copied log entries, oldest first.
    pub events: Vec<ObjectiveEvent>,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
    /// The phase the log belonged to.
    pub phase_id: Option<String>,
}

impl ObjectiveSnapshot {
    fn actions(&self) -> impl DoubleEndedIterator<Item = &TrackedAction> {
        self.events.iter().map(|event| &event.action)
    }
}

impl ActionHistory for ObjectiveSnapshot {
    fn has_moved(&self, direction: &str) -> bool {
        self.actions().any(|action| {
            matches!(action, TrackedAction::Movement { direction: seen } if seen == direction)
        })
    }

    fn has_signal(&self, signal: Signal) -> bool {
        self.actions().any(|action| {
            matches!(
                (signal, action),
                (Signal::TerminalOpened, TrackedAction::TerminalOpened)
                    | (Signal::PlayClicked, TrackedAction::PlayClicked)
                    | (Signal::PlantClicked, TrackedAction::PlantClicked)
                    | (Signal::HarvestClicked, TrackedAction::HarvestClicked)
            )
        })
    }

    fn latest_code(&self) -> Option<&str> {
        self.actions().rev().find_map(|action| match action {
            TrackedAction::CodeChanged { content } => Some(content.as_str()),
            _ => None,
        })
    }

    fn entity_plants(&self, entity_id: &str) -> u32 {
        let count = self
            .actions()
            .filter(|action| {
                matches!(action, TrackedAction::EntityPlant { entity_id: id, .. } if id == entity_id)
            })
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn entity_harvests(&self, entity_id: &str) -> u32 {
        let count = self
            .actions()
            .filter(|action| {
                matches!(action, TrackedAction::EntityHarvest { entity_id: id, .. } if id == entity_id)
            })
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}
