//! Objective (requirement) definitions.

use coven_core::grid::GridPosition;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A checkable condition of a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawObjective")]
pub struct Objective {
    /// Human-readable description shown in the quest log.
    pub description: String,
    /// The condition itself.
    #[serde(flatten)]
    pub requirement: Requirement,
}

impl Objective {
    /// Creates an objective.
    #[must_use]
    pub fn new(description: impl Into<String>, requirement: Requirement) -> Self {
        Self {
            description: description.into(),
            requirement,
        }
    }
}

/// The condition kinds an objective can express.
///
/// `Unknown` and `Malformed` are never read from JSON directly; they are
/// produced when a document names a kind this build does not know or omits
/// fields a known kind needs. Both evaluate as unmet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Requirement {
    /// Each listed direction must have been moved at least once.
    Movement {
        /// Direction tokens; arrow-key and WASD spellings are accepted.
        directions: Vec<String>,
    },
    /// The code terminal must have been opened.
    OpenTerminal,
    /// The latest program text must contain `required_code`.
    CodeContent {
        /// Required substring.
        required_code: String,
    },
    /// The play button must have been pressed.
    PlayButton,
    /// The plant action must have been clicked.
    ActionPlant,
    /// The harvest action must have been clicked.
    ActionHarvest,
    /// The latest program text must contain one of `accepted_commands`.
    MovementCommand {
        /// Acceptable substrings.
        accepted_commands: Vec<String>,
    },
    /// Every listed cell must hold a ready crop of `plant_type`, per live
    /// grid state.
    ChallengeCompletion {
        /// Cells to check.
        positions: Vec<GridPosition>,
        /// Required crop.
        plant_type: String,
    },
    /// A scripted entity must have planted and harvested enough times.
    DroneFarming {
        /// The entity whose actions count.
        entity_id: String,
        /// Minimum plant count.
        #[serde(default)]
        plant_count: u32,
        /// Minimum harvest count.
        #[serde(default)]
        harvest_count: u32,
    },
    /// A kind tag this build does not recognise.
    #[serde(skip_deserializing)]
    Unknown {
        /// The unrecognised tag.
        kind: String,
    },
    /// A known kind whose fields did not parse.
    #[serde(skip_deserializing)]
    Malformed {
        /// The kind tag.
        kind: String,
        /// Parser message.
        reason: String,
    },
}

/// Kind tags accepted in content documents.
pub const KNOWN_KINDS: [&str; 9] = [
    "movement",
    "open_terminal",
    "code_content",
    "play_button",
    "action_plant",
    "action_harvest",
    "movement_command",
    "challenge_completion",
    "drone_farming",
];

impl Requirement {
    /// Returns the kind tag as written in content documents.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Movement { .. } => "movement",
            Self::OpenTerminal => "open_terminal",
            Self::CodeContent { .. } => "code_content",
            Self::PlayButton => "play_button",
            Self::ActionPlant => "action_plant",
            Self::ActionHarvest => "action_harvest",
            Self::MovementCommand { .. } => "movement_command",
            Self::ChallengeCompletion { .. } => "challenge_completion",
            Self::DroneFarming { .. } => "drone_farming",
            Self::Unknown { kind } | Self::Malformed { kind, .. } => kind,
        }
    }
}

#[derive(Deserialize)]
struct RawObjective {
    #[serde(default)]
    description: String,
    #[serde(flatten)]
    body: Map<String, Value>,
}

impl From<RawObjective> for Objective {
    fn from(raw: RawObjective) -> Self {
        let kind = raw
            .body
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned);

        let requirement = match kind {
            None => Requirement::Malformed {
                kind: String::new(),
                reason: "objective has no type tag".to_owned(),
            },
            Some(kind) if !KNOWN_KINDS.contains(&kind.as_str()) => Requirement::Unknown { kind },
            Some(kind) => match serde_json::from_value(Value::Object(raw.body)) {
                Ok(requirement) => requirement,
                Err(e) => Requirement::Malformed {
                    kind,
                    reason: e.to_string(),
                },
            },
        };

        Self {
            description: raw.description,
            requirement,
        }
    }
}
