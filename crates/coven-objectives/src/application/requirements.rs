//! Requirement predicates.
//!
//! The one place that decides whether an objective holds. Event-driven kinds
//! read an [`ActionHistory`]; `challenge_completion` reads live grid state.
//! Unknown and malformed requirements are unmet.

use coven_content::domain::objective::{Objective, Requirement};
use coven_core::grid::GridStateProvider;
use tracing::warn;

use crate::domain::direction::normalize_direction;
use crate::domain::history::{ActionHistory, Signal};

/// Returns whether `objective` holds against `history` and `grid`.
pub fn is_satisfied(
    objective: &Objective,
    history: &dyn ActionHistory,
    grid: &dyn GridStateProvider,
) -> bool {
    match &objective.requirement {
        Requirement::Movement { directions } => directions
            .iter()
            .all(|direction| history.has_moved(&normalize_direction(direction))),
        Requirement::OpenTerminal => history.has_signal(Signal::TerminalOpened),
        Requirement::PlayButton => history.has_signal(Signal::PlayClicked),
        Requirement::ActionPlant => history.has_signal(Signal::PlantClicked),
        Requirement::ActionHarvest => history.has_signal(Signal::HarvestClicked),
        Requirement::CodeContent { required_code } => {
            let required = required_code.trim();
            history
                .latest_code()
                .is_some_and(|code| code.trim().contains(required))
        }
        Requirement::MovementCommand { accepted_commands } => {
            history.latest_code().is_some_and(|code| {
                accepted_commands
                    .iter()
                    .any(|command| code.contains(command.as_str()))
            })
        }
        Requirement::DroneFarming {
            entity_id,
            plant_count,
            harvest_count,
        } => {
            history.entity_plants(entity_id) >= *plant_count
                && history.entity_harvests(entity_id) >= *harvest_count
        }
        Requirement::ChallengeCompletion {
            positions,
            plant_type,
        } => positions.iter().all(|position| {
            grid.grid_at(*position)
                .is_some_and(|tile| tile.has_ready_crop(plant_type))
        }),
        Requirement::Unknown { kind } => {
            warn!(kind = %kind, description = %objective.description, "unknown objective kind treated as unmet");
            false
        }
        Requirement::Malformed { kind, reason } => {
            warn!(kind = %kind, reason = %reason, description = %objective.description, "malformed objective treated as unmet");
            false
        }
    }
}
