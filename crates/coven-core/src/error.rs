//! Domain error types.

use thiserror::Error;

/// Top-level error type for quest, dialogue and content operations.
#[derive(Debug, Error)]
pub enum CovenError {
    /// No quest with this id has been loaded.
    #[error("unknown quest: {0}")]
    UnknownQuest(String),

    /// The quest's prerequisites are not all completed.
    #[error("quest is locked: {0}")]
    QuestLocked(String),

    /// Another quest (or the same one) is already active.
    #[error("quest {active} is already active")]
    QuestAlreadyActive {
        /// The currently active quest.
        active: String,
    },

    /// The operation needs an active quest and there is none.
    #[error("no quest is active")]
    NoActiveQuest,

    /// The operation targeted a quest that is not the active one.
    #[error("quest {0} is not the active quest")]
    QuestNotActive(String),

    /// The operation targeted a phase other than the current one.
    #[error("phase mismatch: current phase is {current}, got {requested}")]
    PhaseMismatch {
        /// The manager's current phase index.
        current: usize,
        /// The phase index the caller asked for.
        requested: usize,
    },

    /// The phase has already been completed.
    #[error("phase {0} is already completed")]
    PhaseAlreadyCompleted(String),

    /// The phase still has objectives that are not completed.
    #[error("phase {phase_id} has {remaining} incomplete objective(s)")]
    ObjectivesIncomplete {
        /// The phase that was asked to advance.
        phase_id: String,
        /// Number of objectives still open.
        remaining: usize,
    },

    /// The objective index is outside the phase's objective list.
    #[error("objective {objective_index} is out of range for phase {phase_id}")]
    ObjectiveOutOfRange {
        /// The phase the objective was looked up in.
        phase_id: String,
        /// The requested index.
        objective_index: usize,
    },

    /// A content document failed parsing or validation.
    #[error("invalid content: {0}")]
    InvalidContent(String),

    /// An I/O, storage or serialization failure.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
