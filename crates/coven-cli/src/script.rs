//! JSON-lines action scripts.
//!
//! Each non-blank line is either a bus event in wire form
//! (`{"name": "tutorial-play-clicked"}`) or a runner command
//! (`{"command": "advance-dialogue"}`). Lines starting with `#` are comments.

use coven_core::event::BusEvent;
use coven_core::grid::GridPosition;
use serde::Deserialize;

use crate::error::AppError;

/// A runner instruction that is not a bus event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    tag = "command",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    /// Start a quest.
    StartQuest {
        /// The quest to start.
        quest_id: String,
    },
    /// Cancel the active quest.
    CancelQuest,
    /// Restart the active quest.
    RestartQuest,
    /// Move past a manual phase.
    AdvancePhase,
    /// Press "next" on the dialogue.
    AdvanceDialogue,
    /// Dismiss the dialogue.
    CloseDialogue,
    /// Ask for a hint.
    RequestHint,
    /// Grow a crop on the grid.
    PlantReady {
        /// The cell.
        position: GridPosition,
        /// The crop.
        plant_type: String,
    },
    /// Log the current progress blob.
    ExportProgress,
}

/// One script line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScriptStep {
    /// A runner command.
    Command(Command),
    /// A bus event to dispatch.
    Event(BusEvent),
}

/// Parses a script. `location` names the file in errors.
///
/// # Errors
///
/// Returns `AppError::Parse` naming the first line that does not parse.
pub fn parse_script(raw: &str, location: &str) -> Result<Vec<ScriptStep>, AppError> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(number, line)| {
            serde_json::from_str(line).map_err(|source| AppError::Parse {
                location: format!("{location}:{}", number + 1),
                source,
            })
        })
        .collect()
}
