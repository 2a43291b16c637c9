//! Quest and phase definitions.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::dialogue::{ChallengeGridSpec, DialogueEntry};
use super::objective::Objective;

/// Curriculum difficulty band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// First contact with a concept.
    Beginner,
    /// Builds on earlier quests.
    Intermediate,
    /// Open-ended challenges.
    Advanced,
    /// Not stated, or a band this build does not know.
    #[default]
    #[serde(other)]
    Unspecified,
}

/// What a completed quest hands out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Reward {
    /// Unlocks another quest regardless of its prerequisites.
    UnlockQuest {
        /// The quest to unlock.
        quest_id: String,
    },
    /// An inventory item.
    Item {
        /// The item id.
        item_id: String,
        /// Quantity.
        #[serde(default = "default_amount")]
        amount: u32,
    },
    /// A resource amount.
    Resource {
        /// The resource id.
        resource_id: String,
        /// Quantity.
        #[serde(default = "default_amount")]
        amount: u32,
    },
    /// A scripting function the player may now call.
    Function {
        /// Function name.
        name: String,
    },
    /// A cosmetic.
    Cosmetic {
        /// The cosmetic id.
        cosmetic_id: String,
    },
}

fn default_amount() -> u32 {
    1
}

impl Reward {
    /// Returns the kind tag as written in content documents.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnlockQuest { .. } => "unlock_quest",
            Self::Item { .. } => "item",
            Self::Resource { .. } => "resource",
            Self::Function { .. } => "function",
            Self::Cosmetic { .. } => "cosmetic",
        }
    }

    /// Returns the id of the granted thing.
    #[must_use]
    pub fn target_id(&self) -> &str {
        match self {
            Self::UnlockQuest { quest_id } => quest_id,
            Self::Item { item_id, .. } => item_id,
            Self::Resource { resource_id, .. } => resource_id,
            Self::Function { name } => name,
            Self::Cosmetic { cosmetic_id } => cosmetic_id,
        }
    }
}

fn default_auto_advance() -> bool {
    true
}

/// A quest subdivision with its own dialogue and objectives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestPhase {
    /// Phase id, unique within the quest.
    pub id: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Dialogue shown when the phase starts.
    #[serde(default)]
    pub pre_dialogue: Vec<DialogueEntry>,
    /// Dialogue shown when the phase completes.
    #[serde(default)]
    pub post_dialogue: Vec<DialogueEntry>,
    /// Conditions that complete the phase.
    #[serde(default)]
    pub objectives: Vec<Objective>,
    /// Challenge grid activated for the whole phase.
    #[serde(default)]
    pub challenge_grid: Option<ChallengeGridSpec>,
    /// Whether completing the phase moves straight on to the next one.
    #[serde(default = "default_auto_advance")]
    pub auto_advance: bool,
    /// Hints handed out on request, in order.
    #[serde(default)]
    pub hints: Vec<String>,
}

/// A top-level curriculum unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    /// Quest id.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Difficulty band.
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Curriculum category, e.g. `"movement"`.
    #[serde(default)]
    pub category: String,
    /// Estimated completion time in minutes.
    #[serde(default, alias = "estimatedTime")]
    pub estimated_minutes: Option<u32>,
    /// Ordered phases.
    pub phases: Vec<QuestPhase>,
    /// Quests that must be completed first.
    #[serde(default)]
    pub prerequisites: BTreeSet<String>,
    /// Rewards granted on completion.
    #[serde(default)]
    pub rewards: Vec<Reward>,
}

impl Quest {
    /// Returns the phase at `index`.
    #[must_use]
    pub fn phase(&self, index: usize) -> Option<&QuestPhase> {
        self.phases.get(index)
    }

    /// Returns whether `index` is the final phase.
    #[must_use]
    pub fn is_last_phase(&self, index: usize) -> bool {
        index + 1 >= self.phases.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_defaults() {
        let phase: QuestPhase = serde_json::from_str(r#"{"id":"intro"}"#).unwrap();

        assert!(phase.auto_advance);
        assert!(phase.objectives.is_empty());
        assert!(phase.pre_dialogue.is_empty());
        assert!(phase.hints.is_empty());
    }

    #[test]
    fn test_unknown_difficulty_falls_back_to_unspecified() {
        let json = r#"{"id":"q","title":"Q","difficulty":"legendary","phases":[]}"#;

        let quest: Quest = serde_json::from_str(json).unwrap();

        assert_eq!(quest.difficulty, Difficulty::Unspecified);
    }

    #[test]
    fn test_rewards_parse_with_default_amount() {
        let json = r#"[
            {"type":"item","itemId":"seed_bag"},
            {"type":"unlock_quest","questId":"q2"},
            {"type":"function","name":"harvest"}
        ]"#;

        let rewards: Vec<Reward> = serde_json::from_str(json).unwrap();

        assert_eq!(
            rewards[0],
            Reward::Item {
                item_id: "seed_bag".to_owned(),
                amount: 1
            }
        );
        assert_eq!(rewards[1].kind(), "unlock_quest");
        assert_eq!(rewards[1].target_id(), "q2");
        assert_eq!(rewards[2].target_id(), "harvest");
    }

    #[test]
    fn test_is_last_phase() {
        let json = r#"{"id":"q","title":"Q","phases":[{"id":"a"},{"id":"b"}]}"#;
        let quest: Quest = serde_json::from_str(json).unwrap();

        assert!(!quest.is_last_phase(0));
        assert!(quest.is_last_phase(1));
        assert_eq!(quest.phase(1).map(|p| p.id.as_str()), Some("b"));
    }
}
