//! Persisted per-quest and per-phase progress.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of one quest for the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestState {
    /// Prerequisites are not all completed.
    Locked,
    /// May be started.
    Available,
    /// Currently being played.
    Active,
    /// Finished at least once.
    Completed,
    /// Given up on. Never produced by this crate, accepted from saved data.
    Failed,
}

/// Progress through one phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhaseProgress {
    /// When the phase was first entered.
    pub started_at: Option<DateTime<Utc>>,
    /// When the phase was completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Indices of completed objectives.
    pub objectives_completed: BTreeSet<usize>,
    /// Index of the pre-dialogue entry last shown. Equal to the entry count
    /// once the pre-dialogue has been read through.
    pub dialogue_cursor: usize,
    /// Number of hints handed out.
    pub hints_used: u32,
}

impl PhaseProgress {
    /// Progress for a phase entered at `now`.
    #[must_use]
    pub fn started(now: DateTime<Utc>) -> Self {
        Self {
            started_at: Some(now),
            ..Self::default()
        }
    }

    /// Whether the phase has been completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Progress through one quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestProgress {
    /// The quest this record belongs to.
    pub quest_id: String,
    /// Lifecycle state.
    pub state: QuestState,
    /// When the current attempt started.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// When the quest was last completed.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Index of the phase being played.
    #[serde(default)]
    pub current_phase_index: usize,
    /// Number of times the quest has been started.
    #[serde(default)]
    pub attempts: u32,
    /// Phase id → progress.
    #[serde(default)]
    pub phases: BTreeMap<String, PhaseProgress>,
}

impl QuestProgress {
    /// A first attempt at `quest_id` starting at `now`.
    #[must_use]
    pub fn first_attempt(quest_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            quest_id: quest_id.to_owned(),
            state: QuestState::Active,
            started_at: Some(now),
            completed_at: None,
            current_phase_index: 0,
            attempts: 1,
            phases: BTreeMap::new(),
        }
    }
}

/// The persisted progress blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressSnapshot {
    /// Every quest the player has touched.
    pub quests: Vec<QuestProgress>,
    /// Quests whose prerequisites were met, or that a reward unlocked.
    pub unlocked_quests: BTreeSet<String>,
    /// The quest being played.
    pub active_quest_id: Option<String>,
    /// Phase index within the active quest.
    pub current_phase_index: usize,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_snapshot_serializes_with_camel_case_keys() {
        // Arrange
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut progress = QuestProgress::first_attempt("first-steps", now);
        let mut phase = PhaseProgress::started(now);
        phase.objectives_completed.extend([1, 0]);
        progress.phases.insert("move".to_owned(), phase);
        let snapshot = ProgressSnapshot {
            quests: vec![progress],
            unlocked_quests: BTreeSet::from(["first-steps".to_owned()]),
            active_quest_id: Some("first-steps".to_owned()),
            current_phase_index: 0,
        };

        // Act
        let json = serde_json::to_value(&snapshot).unwrap();

        // Assert
        assert_eq!(json["activeQuestId"], "first-steps");
        assert_eq!(json["unlockedQuests"][0], "first-steps");
        assert_eq!(json["quests"][0]["state"], "active");
        assert_eq!(
            json["quests"][0]["phases"]["move"]["objectivesCompleted"],
            serde_json::json!([0, 1])
        );
    }

    #[test]
    fn test_sparse_blob_fills_defaults() {
        let json = r#"{"quests":[{"questId":"q","state":"completed"}]}"#;

        let snapshot: ProgressSnapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.quests[0].state, QuestState::Completed);
        assert_eq!(snapshot.quests[0].attempts, 0);
        assert!(snapshot.unlocked_quests.is_empty());
        assert_eq!(snapshot.active_quest_id, None);
    }
}
