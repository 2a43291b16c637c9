//! The aggregate holding every piece of quest progress.

use std::collections::{BTreeMap, BTreeSet};

use coven_content::domain::quest::Quest;

use super::progress::{ProgressSnapshot, QuestProgress, QuestState};

/// Registered content plus the player's progress through it.
///
/// Loaded quests survive [`reset`](Self::reset); everything the player did
/// does not.
#[derive(Debug, Clone, Default)]
pub struct QuestEngineState {
    /// Registered quests by id.
    pub quests: BTreeMap<String, Quest>,
    /// Content hash of each registered quest document.
    pub content_hashes: BTreeMap<String, String>,
    /// Progress by quest id.
    pub progress: BTreeMap<String, QuestProgress>,
    /// Unlocked quest ids.
    pub unlocked: BTreeSet<String>,
    /// The quest being played.
    pub active_quest_id: Option<String>,
    /// Phase index within the active quest.
    pub current_phase_index: usize,
}

impl QuestEngineState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets all player progress, keeping registered quests.
    pub fn reset(&mut self) {
        self.progress.clear();
        self.unlocked.clear();
        self.active_quest_id = None;
        self.current_phase_index = 0;
    }

    /// Returns the player-facing state of `quest_id`, or `None` when the
    /// quest is neither registered nor has saved progress.
    #[must_use]
    pub fn quest_state(&self, quest_id: &str) -> Option<QuestState> {
        if let Some(progress) = self.progress.get(quest_id) {
            return Some(progress.state);
        }
        if !self.quests.contains_key(quest_id) {
            return None;
        }
        if self.unlocked.contains(quest_id) {
            Some(QuestState::Available)
        } else {
            Some(QuestState::Locked)
        }
    }

    /// Whether the player has completed `quest_id`.
    #[must_use]
    pub fn is_completed(&self, quest_id: &str) -> bool {
        self.progress
            .get(quest_id)
            .is_some_and(|p| p.completed_at.is_some() || p.state == QuestState::Completed)
    }

    /// Whether every prerequisite of `quest` is completed.
    #[must_use]
    pub fn prerequisites_met(&self, quest: &Quest) -> bool {
        quest.prerequisites.iter().all(|id| self.is_completed(id))
    }

    /// The active quest definition and its current phase index.
    #[must_use]
    pub fn active(&self) -> Option<(&Quest, usize)> {
        let id = self.active_quest_id.as_deref()?;
        self.quests.get(id).map(|q| (q, self.current_phase_index))
    }

    /// Copies the persisted part of the state.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            quests: self.progress.values().cloned().collect(),
            unlocked_quests: self.unlocked.clone(),
            active_quest_id: self.active_quest_id.clone(),
            current_phase_index: self.current_phase_index,
        }
    }

    /// Replaces all player progress with `snapshot`.
    pub fn apply_snapshot(&mut self, snapshot: ProgressSnapshot) {
        self.progress = snapshot
            .quests
            .into_iter()
            .map(|p| (p.quest_id.clone(), p))
            .collect();
        self.unlocked = snapshot.unlocked_quests;
        self.active_quest_id = snapshot.active_quest_id;
        self.current_phase_index = snapshot.current_phase_index;
    }
}
