//! Bus events exchanged between the game/UI layer and the quest core.

use serde::{Deserialize, Serialize};

use crate::grid::GridPosition;

/// Severity of a player-facing quest notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Neutral progress information.
    Info,
    /// Something was achieved.
    Success,
    /// The requested action could not be performed.
    Warning,
}

/// Every named event that travels over the process-wide bus.
///
/// Serializes as `{"name": "tutorial-movement", "payload": {"direction": "up"}}`.
/// Variants above `QuestLoaded` are consumed by the core; the rest are
/// produced by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "name",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum BusEvent {
    /// Request to load and open a dialogue document.
    StartDialogue {
        /// Content id or path of the dialogue document.
        source: String,
    },
    /// The player moved the qubit.
    TutorialMovement {
        /// Raw key or direction token, e.g. `"ArrowUp"` or `"w"`.
        direction: String,
    },
    /// The player opened the code terminal.
    TutorialTerminalOpened,
    /// The player's program text changed.
    TutorialCodeChanged {
        /// Full program text after the change.
        content: String,
    },
    /// The player pressed the play button.
    TutorialPlayClicked,
    /// The player clicked the plant action.
    ActionPlantClicked,
    /// The player clicked the harvest action.
    ActionHarvestClicked,
    /// A scripted entity planted a crop.
    EntityPlant {
        /// The acting entity.
        entity_id: String,
        /// Kind of entity, e.g. `"drone"`.
        entity_type: String,
        /// Crop that was planted.
        crop_type: String,
        /// Where it was planted.
        position: GridPosition,
    },
    /// A scripted entity harvested a crop.
    EntityHarvest {
        /// The acting entity.
        entity_id: String,
        /// Kind of entity, e.g. `"drone"`.
        entity_type: String,
        /// Where it harvested.
        position: GridPosition,
    },

    /// A quest definition was registered.
    QuestLoaded {
        /// The quest id.
        quest_id: String,
        /// The quest title.
        title: String,
        /// SHA-256 of the source document.
        content_hash: String,
    },
    /// A quest became the active quest.
    QuestStarted {
        /// The quest id.
        quest_id: String,
        /// Attempt number, starting at 1.
        attempt: u32,
    },
    /// The active quest was cancelled and reset.
    QuestCancelled {
        /// The quest id.
        quest_id: String,
    },
    /// The active quest finished its last phase.
    QuestCompleted {
        /// The quest id.
        quest_id: String,
    },
    /// A phase began.
    QuestPhaseStarted {
        /// The quest id.
        quest_id: String,
        /// The phase id.
        phase_id: String,
        /// Index of the phase within the quest.
        phase_index: usize,
    },
    /// A phase was completed.
    QuestPhaseCompleted {
        /// The quest id.
        quest_id: String,
        /// The phase id.
        phase_id: String,
        /// Index of the phase within the quest.
        phase_index: usize,
    },
    /// An objective of the current phase was satisfied.
    QuestObjectiveCompleted {
        /// The quest id.
        quest_id: String,
        /// Index of the phase within the quest.
        phase_index: usize,
        /// Index of the objective within the phase.
        objective_index: usize,
        /// Human-readable objective description.
        description: String,
    },
    /// A quest's prerequisites are now all satisfied.
    QuestUnlocked {
        /// The quest id.
        quest_id: String,
    },
    /// Player-facing toast text.
    QuestNotification {
        /// Severity.
        kind: NotificationKind,
        /// Message to display.
        message: String,
    },
    /// One reward of a completed quest was granted.
    QuestRewardGranted {
        /// The quest that granted the reward.
        quest_id: String,
        /// Reward kind tag, e.g. `"item"`.
        reward_type: String,
        /// Id of the granted thing.
        reward_id: String,
    },
    /// Grant an inventory item.
    RewardItem {
        /// The item id.
        item_id: String,
        /// Quantity.
        amount: u32,
    },
    /// Grant a resource amount.
    RewardResource {
        /// The resource id.
        resource_id: String,
        /// Quantity.
        amount: u32,
    },
    /// Unlock a scripting function for the player's programs.
    RewardFunction {
        /// The function name.
        name: String,
    },
    /// Grant a cosmetic.
    RewardCosmetic {
        /// The cosmetic id.
        cosmetic_id: String,
    },
    /// Challenge-grid positions were activated for a phase.
    QuestChallengeGrids {
        /// The quest id.
        quest_id: String,
        /// Activated positions.
        positions: Vec<GridPosition>,
    },
    /// A dialogue sequence opened.
    DialogueOpened {
        /// Number of entries in the sequence.
        entry_count: usize,
    },
    /// The dialogue sequence closed.
    DialogueClosed,
}

impl BusEvent {
    /// Returns the wire name of this event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartDialogue { .. } => "start-dialogue",
            Self::TutorialMovement { .. } => "tutorial-movement",
            Self::TutorialTerminalOpened => "tutorial-terminal-opened",
            Self::TutorialCodeChanged { .. } => "tutorial-code-changed",
            Self::TutorialPlayClicked => "tutorial-play-clicked",
            Self::ActionPlantClicked => "action-plant-clicked",
            Self::ActionHarvestClicked => "action-harvest-clicked",
            Self::EntityPlant { .. } => "entity-plant",
            Self::EntityHarvest { .. } => "entity-harvest",
            Self::QuestLoaded { .. } => "quest-loaded",
            Self::QuestStarted { .. } => "quest-started",
            Self::QuestCancelled { .. } => "quest-cancelled",
            Self::QuestCompleted { .. } => "quest-completed",
            Self::QuestPhaseStarted { .. } => "quest-phase-started",
            Self::QuestPhaseCompleted { .. } => "quest-phase-completed",
            Self::QuestObjectiveCompleted { .. } => "quest-objective-completed",
            Self::QuestUnlocked { .. } => "quest-unlocked",
            Self::QuestNotification { .. } => "quest-notification",
            Self::QuestRewardGranted { .. } => "quest-reward-granted",
            Self::RewardItem { .. } => "reward-item",
            Self::RewardResource { .. } => "reward-resource",
            Self::RewardFunction { .. } => "reward-function",
            Self::RewardCosmetic { .. } => "reward-cosmetic",
            Self::QuestChallengeGrids { .. } => "quest-challenge-grids",
            Self::DialogueOpened { .. } => "dialogue-opened",
            Self::DialogueClosed => "dialogue-closed",
        }
    }

    /// Returns whether this is a player action the objective log records.
    #[must_use]
    pub fn is_player_action(&self) -> bool {
        matches!(
            self,
            Self::TutorialMovement { .. }
                | Self::TutorialTerminalOpened
                | Self::TutorialCodeChanged { .. }
                | Self::TutorialPlayClicked
                | Self::ActionPlantClicked
                | Self::ActionHarvestClicked
                | Self::EntityPlant { .. }
                | Self::EntityHarvest { .. }
        )
    }
}

/// Process-wide publish side of the event bus.
pub trait EventBus: Send + Sync {
    /// Publishes `event` to every external subscriber.
    fn emit(&self, event: &BusEvent);
}
