//! Tracked player actions and log entries.

use chrono::{DateTime, Utc};
use coven_core::event::BusEvent;
use coven_core::grid::GridPosition;
use serde::Serialize;
use uuid::Uuid;

use super::direction::normalize_direction;

/// A player action the objective log records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackedAction {
    /// The qubit moved; `direction` is already normalized.
    Movement {
        /// Normalized direction.
        direction: String,
    },
    /// The code terminal was opened.
    TerminalOpened,
    /// The program text changed.
    CodeChanged {
        /// Full program text.
        content: String,
    },
    /// The play button was pressed.
    PlayClicked,
    /// The plant action was clicked.
    PlantClicked,
    /// The harvest action was clicked.
    HarvestClicked,
    /// A scripted entity planted.
    EntityPlant {
        /// The acting entity.
        entity_id: String,
        /// Planted crop.
        crop_type: String,
        /// Planted cell.
        position: GridPosition,
    },
    /// A scripted entity harvested.
    EntityHarvest {
        /// The acting entity.
        entity_id: String,
        /// Harvested cell.
        position: GridPosition,
    },
}

impl TrackedAction {
    /// Maps a bus event to the action it records, if it is a player action.
    #[must_use]
    pub fn from_bus_event(event: &BusEvent) -> Option<Self> {
        let action = match event {
            BusEvent::TutorialMovement { direction } => Self::Movement {
                direction: normalize_direction(direction),
            },
            BusEvent::TutorialTerminalOpened => Self::TerminalOpened,
            BusEvent::TutorialCodeChanged { content } => Self::CodeChanged {
                content: content.clone(),
            },
            BusEvent::TutorialPlayClicked => Self::PlayClicked,
            BusEvent::ActionPlantClicked => Self::PlantClicked,
            BusEvent::ActionHarvestClicked => Self::HarvestClicked,
            BusEvent::EntityPlant {
                entity_id,
                crop_type,
                position,
                ..
            } => Self::EntityPlant {
                entity_id: entity_id.clone(),
                crop_type: crop_type.clone(),
                position: *position,
            },
            BusEvent::EntityHarvest {
                entity_id,
                position,
                ..
            } => Self::EntityHarvest {
                entity_id: entity_id.clone(),
                position: *position,
            },
            _ => return None,
        };
        Some(action)
    }

    /// Returns the log type tag of this action.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Movement { .. } => "movement",
            Self::TerminalOpened => "terminal_opened",
            Self::CodeChanged { .. } => "code_changed",
            Self::PlayClicked => "play_clicked",
            Self::PlantClicked => "plant_clicked",
            Self::HarvestClicked => "harvest_clicked",
            Self::EntityPlant { .. } => "entity_plant",
            Self::EntityHarvest { .. } => "entity_harvest",
        }
    }
}

/// One immutable entry of the per-phase objective log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveEvent {
    /// Unique entry id.
    pub event_id: Uuid,
    /// What happened.
    pub action: TrackedAction,
    /// When it was recorded.
    pub recorded_at: DateTime<Utc>,
}
