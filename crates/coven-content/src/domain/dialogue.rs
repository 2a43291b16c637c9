//! Dialogue definitions.

use coven_core::grid::GridPosition;
use serde::{Deserialize, Serialize};

use super::objective::Objective;

const DEFAULT_PAN_DURATION_MS: u32 = 1000;

fn default_pan_duration() -> u32 {
    DEFAULT_PAN_DURATION_MS
}

/// Camera pan applied when an entry becomes current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraPan {
    /// World x coordinate.
    pub x: f64,
    /// World y coordinate.
    pub y: f64,
    /// Pan duration in milliseconds.
    #[serde(default = "default_pan_duration")]
    pub duration_ms: u32,
}

/// Grid positions to highlight as the active challenge grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeGridSpec {
    /// Highlighted cells.
    pub positions: Vec<GridPosition>,
}

/// One line of dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueEntry {
    /// Who is speaking, if anyone.
    #[serde(default)]
    pub speaker: Option<String>,
    /// The line itself.
    pub text: String,
    /// Camera pan applied when this entry becomes current.
    #[serde(default)]
    pub camera: Option<CameraPan>,
    /// Challenge grid activated when this entry becomes current.
    #[serde(default)]
    pub challenge_grid: Option<ChallengeGridSpec>,
    /// Objectives gating advancement past this entry. Only the first one is
    /// checked.
    #[serde(default)]
    pub objectives: Vec<Objective>,
}

impl DialogueEntry {
    /// Creates a plain entry with no directives or objectives.
    #[must_use]
    pub fn line(speaker: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.map(str::to_owned),
            text: text.into(),
            camera: None,
            challenge_grid: None,
            objectives: Vec::new(),
        }
    }

    /// Returns the objective that gates advancing past this entry.
    #[must_use]
    pub fn gate(&self) -> Option<&Objective> {
        self.objectives.first()
    }
}

/// A standalone dialogue file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueDocument {
    /// Optional document id.
    #[serde(default)]
    pub id: Option<String>,
    /// Ordered entries.
    pub entries: Vec<DialogueEntry>,
}
