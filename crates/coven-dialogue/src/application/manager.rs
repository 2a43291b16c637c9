//! The dialogue manager state machine.

use std::sync::Arc;

use coven_content::application::loader::parse_dialogue;
use coven_content::domain::dialogue::DialogueEntry;
use coven_content::domain::objective::Objective;
use coven_core::camera::CameraController;
use coven_core::content::ContentSource;
use coven_core::event::BusEvent;
use coven_core::grid::GridStateProvider;
use coven_objectives::application::requirements;
use tracing::{debug, info, warn};

use crate::domain::tutorial::TutorialState;

/// Coarse lifecycle of the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueStatus {
    /// No dialogue open.
    Inactive,
    /// A dialogue document is being fetched.
    Loading,
    /// A sequence is open.
    Active,
}

/// Outcome of [`DialogueManager::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueAdvance {
    /// Nothing is open.
    Inactive,
    /// The current entry's objective is unmet; the entry is now acknowledged.
    AwaitingRequirement,
    /// Moved to the entry at this index.
    Advanced(usize),
    /// The last entry was passed and the sequence closed.
    Closed,
}

#[derive(Debug)]
enum DialogueState {
    Inactive,
    Loading {
        source: String,
    },
    Active {
        entries: Vec<DialogueEntry>,
        index: usize,
    },
}

/// Drives a single linear dialogue sequence.
pub struct DialogueManager {
    camera: Arc<dyn CameraController>,
    grid: Arc<dyn GridStateProvider>,
    state: DialogueState,
    acknowledged: bool,
    tutorial: TutorialState,
    pending_signals: Vec<BusEvent>,
}

impl std::fmt::Debug for DialogueManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueManager")
            .field("state", &self.state)
            .field("acknowledged", &self.acknowledged)
            .finish_non_exhaustive()
    }
}

impl DialogueManager {
    /// Creates an inactive manager.
    #[must_use]
    pub fn new(camera: Arc<dyn CameraController>, grid: Arc<dyn GridStateProvider>) -> Self {
        Self {
            camera,
            grid,
            state: DialogueState::Inactive,
            acknowledged: false,
            tutorial: TutorialState::default(),
            pending_signals: Vec::new(),
        }
    }

    /// Returns the coarse lifecycle state.
    #[must_use]
    pub fn status(&self) -> DialogueStatus {
        match self.state {
            DialogueState::Inactive => DialogueStatus::Inactive,
            DialogueState::Loading { .. } => DialogueStatus::Loading,
            DialogueState::Active { .. } => DialogueStatus::Active,
        }
    }

    /// Whether a sequence is open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.state, DialogueState::Active { .. })
    }

    /// Whether the player has seen the current entry's instruction.
    #[must_use]
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged
    }

    /// Index of the current entry.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            DialogueState::Active { index, .. } => Some(index),
            _ => None,
        }
    }

    /// The current entry.
    #[must_use]
    pub fn current_entry(&self) -> Option<&DialogueEntry> {
        match &self.state {
            DialogueState::Active { entries, index } => entries.get(*index),
            _ => None,
        }
    }

    /// Number of entries in the open sequence.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        match &self.state {
            DialogueState::Active { entries, .. } => entries.len(),
            _ => 0,
        }
    }

    /// Fetches the dialogue document `source` and opens it.
    ///
    /// An open sequence is closed before the fetch. Load and parse failures
    /// are logged and leave the manager inactive. Returns whether a sequence
    /// opened.
    pub async fn start_dialogue(&mut self, source: &str, content: &dyn ContentSource) -> bool {
        self.close_open_sequence();
        self.state = DialogueState::Loading {
            source: source.to_owned(),
        };

        let loaded = match content.fetch(source).await {
            Ok(raw) => parse_dialogue(&raw),
            Err(e) => Err(e),
        };

        let still_pending =
            matches!(&self.state, DialogueState::Loading { source: pending } if pending == source);
        if !still_pending {
            debug!(source, "dialogue load superseded");
            return false;
        }

        match loaded {
            Ok(entries) => self.start_sequence(entries),
            Err(e) => {
                warn!(source, error = %e, "dialogue load failed");
                self.state = DialogueState::Inactive;
                false
            }
        }
    }

    /// Opens `entries` at the first entry. Returns false for an empty list.
    pub fn start_sequence(&mut self, entries: Vec<DialogueEntry>) -> bool {
        self.start_sequence_at(entries, 0)
    }

    /// Opens `entries` at `index`, clamped to the last entry, closing any
    /// open sequence first. Returns false for an empty list.
    pub fn start_sequence_at(&mut self, entries: Vec<DialogueEntry>, index: usize) -> bool {
        if entries.is_empty() {
            warn!("refusing to open an empty dialogue sequence");
            return false;
        }

        let index = index.min(entries.len() - 1);
        let entry_count = entries.len();
        self.close_open_sequence();
        self.tutorial.reset();
        self.acknowledged = false;
        self.state = DialogueState::Active { entries, index };
        self.apply_entry_directives();

        info!(entry_count, index, "dialogue opened");
        self.pending_signals
            .push(BusEvent::DialogueOpened { entry_count });
        true
    }

    /// Moves past the current entry unless its gating objective is unmet.
    pub fn advance(&mut self) -> DialogueAdvance {
        let (index, len) = match &self.state {
            DialogueState::Active { entries, index } => (*index, entries.len()),
            _ => return DialogueAdvance::Inactive,
        };

        if self.current_gate_met() == Some(false) {
            self.acknowledged = true;
            debug!(index, "dialogue waiting on requirement");
            return DialogueAdvance::AwaitingRequirement;
        }

        if index + 1 >= len {
            self.close();
            return DialogueAdvance::Closed;
        }

        if let DialogueState::Active { index, .. } = &mut self.state {
            *index += 1;
        }
        self.acknowledged = false;
        self.apply_entry_directives();
        DialogueAdvance::Advanced(index + 1)
    }

    /// Whether the view should hide the dialogue box so the player can act.
    #[must_use]
    pub fn should_hide(&self) -> bool {
        self.acknowledged && self.current_gate_met() == Some(false)
    }

    /// Closes the open sequence, locking the camera back onto the qubit and
    /// deactivating every challenge grid. Does nothing while inactive.
    pub fn close(&mut self) {
        if matches!(self.state, DialogueState::Inactive) {
            return;
        }

        self.camera.lock_to_qubit();
        self.grid.deactivate_all_challenge_grids();
        self.state = DialogueState::Inactive;
        self.acknowledged = false;
        self.tutorial.reset();

        info!("dialogue closed");
        self.pending_signals.push(BusEvent::DialogueClosed);
    }

    /// Evaluates `objective` against the tutorial state.
    #[must_use]
    pub fn is_requirement_met(&self, objective: &Objective) -> bool {
        requirements::is_satisfied(objective, &self.tutorial, self.grid.as_ref())
    }

    /// Folds a bus event into the tutorial state and auto-advances when the
    /// acknowledged entry's objective became met.
    pub fn observe(&mut self, event: &BusEvent) {
        if !self.tutorial.observe(event) {
            return;
        }
        if self.acknowledged && self.current_gate_met() == Some(true) {
            debug!(event = event.name(), "dialogue requirement met; auto-advancing");
            self.advance();
        }
    }

    /// Events emitted since the last [`take_signals`](Self::take_signals).
    #[must_use]
    pub fn pending_signals(&self) -> &[BusEvent] {
        &self.pending_signals
    }

    /// Drains the emitted events.
    pub fn take_signals(&mut self) -> Vec<BusEvent> {
        std::mem::take(&mut self.pending_signals)
    }

    fn close_open_sequence(&mut self) {
        if self.is_active() {
            debug!("replacing open dialogue");
            self.close();
        }
    }

    /// `None` when there is no gate, otherwise whether it is met.
    fn current_gate_met(&self) -> Option<bool> {
        let gate = self.current_entry()?.gate()?;
        Some(self.is_requirement_met(gate))
    }

    fn apply_entry_directives(&mut self) {
        let Some(entry) = self.current_entry() else {
            return;
        };
        let camera = entry.camera.clone();
        let grid = entry.challenge_grid.clone();

        if let Some(pan) = camera {
            self.camera.pan_to(pan.x, pan.y, pan.duration_ms);
        }
        if let Some(spec) = grid {
            self.grid.activate_challenge_grids(&spec.positions);
        }
    }
}
